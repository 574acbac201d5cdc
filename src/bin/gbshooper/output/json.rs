use std::collections::BTreeMap;

use gbshooper::serial::FlasherPort;
use serde::Serialize;

use crate::output::{port_to_value, Event, OutputOptions, Reporter};

#[derive(serde::Serialize)]
pub struct JsonEvent {
    schema: u32,
    event: &'static str,
    #[serde(flatten)]
    fields: BTreeMap<&'static str, serde_json::Value>,
}

impl JsonEvent {
    pub fn status(event: &'static str) -> Self {
        Self {
            schema: 1,
            event,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_u64(mut self, k: &'static str, v: u64) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_str(mut self, k: &'static str, v: &str) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_value(mut self, k: &'static str, v: serde_json::Value) -> Self {
        self.fields.insert(k, v);
        self
    }

    pub fn with_record<T: Serialize>(self, record: &T) -> Self {
        let v = serde_json::to_value(record).unwrap_or(serde_json::Value::Null);
        self.with_value("result", v)
    }
}

pub struct JsonOutput {
    opts: OutputOptions,
}

impl JsonOutput {
    pub fn new(opts: OutputOptions) -> Self {
        Self { opts }
    }

    pub(crate) fn render_event_json(&self, ev: &JsonEvent) -> String {
        serde_json::to_string(ev).unwrap_or_else(|_| "{}".to_string())
    }

    fn json_event(&mut self, ev: JsonEvent) {
        println!("{}", self.render_event_json(&ev));
    }
}

impl Reporter for JsonOutput {
    fn emit(&mut self, event: Event) {
        if let Event::Error { message, .. } = &event {
            if self.opts.verbose {
                eprintln!("error: {message}");
            }
        }
        self.json_event(event_to_json(event));
    }

    fn finish(&mut self) {}
}

pub fn event_to_json(event: Event) -> JsonEvent {
    match event {
        Event::Start { operation, detail } => {
            let ev = JsonEvent::status("start").with_str("operation", operation.as_str());
            match detail {
                Some(d) => ev.with_str("detail", &d),
                None => ev,
            }
        }
        Event::Progress { operation, percent } => JsonEvent::status("progress")
            .with_str("operation", operation.as_str())
            .with_u64("percent", percent as u64),
        Event::Status(s) => JsonEvent::status("status").with_record(&s),
        Event::ChipId(c) => JsonEvent::status("chip_id").with_record(&c),
        Event::Header(h) => JsonEvent::status("header").with_record(&h),
        Event::Erased { memory } => JsonEvent::status("erased").with_value(
            "memory",
            serde_json::to_value(memory).unwrap_or(serde_json::Value::Null),
        ),
        Event::Transferred {
            operation,
            path,
            bytes,
        } => JsonEvent::status("done")
            .with_str("operation", operation.as_str())
            .with_str("path", &path.to_string_lossy())
            .with_u64("bytes", bytes),
        Event::ListDevices(ports) => list_to_json(&ports),
        Event::Error {
            code,
            kind,
            message,
        } => {
            let ev = JsonEvent::status("error")
                .with_u64("code", code.max(0) as u64)
                .with_str("message", &message);
            match kind {
                Some(k) => ev.with_str("kind", k.as_str()),
                None => ev,
            }
        }
    }
}

pub fn list_to_json(ports: &[FlasherPort]) -> JsonEvent {
    JsonEvent::status("list")
        .with_u64("count", ports.len() as u64)
        .with_value(
            "devices",
            serde_json::Value::Array(
                ports
                    .iter()
                    .enumerate()
                    .map(|(i, p)| port_to_value(i, p))
                    .collect(),
            ),
        )
}
