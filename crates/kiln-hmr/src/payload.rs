//! Messages pushed to HMR clients.
//!
//! Every payload is a JSON object tagged by `type`:
//!
//! ```json
//! {"type":"update","updates":[{"type":"js-update","path":"/src/main.js","acceptedPath":"/src/util.js","timestamp":1700000000000}]}
//! ```

use kiln_graph::ModuleKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HmrPayload {
    /// First message on every new connection
    Connected,
    Update {
        updates: Vec<Update>,
    },
    FullReload {
        /// Root-relative page that changed; absent means any page
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    /// Modules no longer imported by anything
    Prune {
        paths: Vec<String>,
    },
    Error {
        err: ErrorPayload,
    },
    Custom {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
}

impl HmrPayload {
    pub fn is_error(&self) -> bool {
        matches!(self, HmrPayload::Error { .. })
    }
}

/// One hot update: re-import `path` because `accepted_path` changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    /// Url of the boundary module
    pub path: String,
    /// Url of the module the boundary accepted the update through
    pub accepted_path: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    JsUpdate,
    CssUpdate,
}

impl From<ModuleKind> for UpdateKind {
    fn from(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::Script => UpdateKind::JsUpdate,
            ModuleKind::Style => UpdateKind::CssUpdate,
        }
    }
}

/// Compile or runtime error shown by the client overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default)]
    pub stack: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Code frame around the error location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<ErrorLocation>,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn with_loc(mut self, loc: ErrorLocation) -> Self {
        self.loc = Some(loc);
        self
    }

    /// Payload for any error, with its source chain as the stack.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(err.to_string()).with_stack(stack)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}
