use std::collections::HashMap;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::{
    application::services::listener::EventListener,
    domain::errors::{DispatchError, DispatchResult},
    infrastructure::logging::daily_file::DailyLogFile,
};

const INDENT: &str = "\t";

/// Where rendered protocol events go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenType {
    #[default]
    Screen,
    File,
    Custom,
    Mixed,
}

impl ListenType {
    pub fn writes_file(&self) -> bool {
        matches!(self, ListenType::File | ListenType::Mixed)
    }
}

impl FromStr for ListenType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "screen" | "echo" => Ok(ListenType::Screen),
            "file" => Ok(ListenType::File),
            "custom" => Ok(ListenType::Custom),
            "mixed" => Ok(ListenType::Mixed),
            other => Err(format!("unknown listen type '{other}'")),
        }
    }
}

/// Process context deciding how screen output is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputContext {
    #[default]
    Terminal,
    Web,
}

impl FromStr for OutputContext {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "terminal" | "cli" => Ok(OutputContext::Terminal),
            "web" | "http" => Ok(OutputContext::Web),
            other => Err(format!("unknown output context '{other}'")),
        }
    }
}

/// Renders protocol events through the template table and routes them to
/// the screen, a daily log file or a registered listener.
pub struct EventNotifier {
    listen_type: ListenType,
    templates: HashMap<String, String>,
    listener: Option<Arc<dyn EventListener>>,
    log_file: Option<DailyLogFile>,
    output: OutputContext,
    screen: Mutex<Box<dyn Write + Send>>,
}

impl EventNotifier {
    pub fn new(listen_type: ListenType, templates: HashMap<String, String>) -> Self {
        Self {
            listen_type,
            templates,
            listener: None,
            log_file: None,
            output: OutputContext::default(),
            screen: Mutex::new(Box::new(io::stdout())),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_log_file(mut self, log_file: DailyLogFile) -> Self {
        self.log_file = Some(log_file);
        self
    }

    pub fn with_output(mut self, output: OutputContext) -> Self {
        self.output = output;
        self
    }

    pub fn with_screen(mut self, screen: Box<dyn Write + Send>) -> Self {
        self.screen = Mutex::new(screen);
        self
    }

    pub fn listen_type(&self) -> ListenType {
        self.listen_type
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    pub fn set_template(&mut self, event: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(event.into(), template.into());
    }

    /// Fires an event. Missing templates and missing listeners are silent.
    pub fn fire(&self, event: &str, parameters: &Map<String, Value>) -> DispatchResult<()> {
        let message = self
            .templates
            .get(event)
            .map(|template| render(template, parameters));

        if self.listen_type == ListenType::Custom {
            if let Some(listener) = &self.listener {
                listener.fire(event, parameters, message.as_deref().unwrap_or_default());
            }
            return Ok(());
        }

        let Some(message) = message else {
            return Ok(());
        };

        if self.listen_type.writes_file() {
            let log_file = self
                .log_file
                .as_ref()
                .ok_or_else(|| DispatchError::LogPathUnavailable("<unset>".to_string()))?;
            log_file.append(event, &message)?;
        }

        if matches!(self.listen_type, ListenType::Screen | ListenType::Mixed) {
            self.write_screen(&message)?;
        }

        Ok(())
    }

    fn write_screen(&self, message: &str) -> DispatchResult<()> {
        let mut screen = self
            .screen
            .lock()
            .map_err(|_| io::Error::other("screen writer poisoned"))?;
        match self.output {
            OutputContext::Terminal => writeln!(screen, "{message}")?,
            OutputContext::Web => write!(screen, "{message}<br />")?,
        }
        screen.flush()?;
        Ok(())
    }
}

/// Substitutes every `{key}` placeholder with the matching parameter in a
/// single pass. Inserted values are never scanned again; unknown keys stay.
pub fn render(template: &str, parameters: &Map<String, Value>) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rendered.push_str(&rest[open..]);
            return rendered;
        };
        match parameters.get(&after[..close]) {
            Some(value) => {
                rendered.push_str(&stringify(value, 0));
                rest = &after[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = after;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// Renders a parameter value; nested structures get one indent per level.
pub fn stringify(value: &Value, depth: usize) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| nested_line(&index.to_string(), item, depth))
            .collect(),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, item)| nested_line(key, item, depth))
            .collect(),
    }
}

fn nested_line(key: &str, value: &Value, depth: usize) -> String {
    format!(
        "\n{}{}: {}",
        INDENT.repeat(depth + 1),
        key,
        stringify(value, depth + 1)
    )
}
