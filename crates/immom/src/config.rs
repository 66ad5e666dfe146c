//! Session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ImmError, ImmResult};
use crate::service::{CcbFlags, ImmVersion};

/// Settings for a [`Session`](crate::session::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interface version requested from the service.
    #[serde(default)]
    pub version: ImmVersion,

    /// Release objects owned by the admin owner when it is finalized.
    #[serde(default = "default_true")]
    pub release_ownership_on_finalize: bool,

    /// Longest accepted DN or admin owner name (`SA_MAX_NAME_LENGTH`).
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// How long an administrative operation may take.
    #[serde(default = "default_admin_operation_timeout")]
    pub admin_operation_timeout_secs: u64,

    /// Flags used by [`Session::ccb_initialize_default`](crate::session::Session::ccb_initialize_default).
    #[serde(default)]
    pub ccb_flags: CcbFlags,

    /// Object holding the list of registered class names.
    #[serde(default = "default_class_names_dn")]
    pub class_names_dn: String,

    /// Attribute of `class_names_dn` listing the class names.
    #[serde(default = "default_class_names_attribute")]
    pub class_names_attribute: String,
}

fn default_true() -> bool {
    true
}

fn default_max_name_length() -> usize {
    256
}

fn default_admin_operation_timeout() -> u64 {
    60
}

fn default_class_names_dn() -> String {
    "opensafImm=opensafImm,safApp=safImmService".to_string()
}

fn default_class_names_attribute() -> String {
    "opensafImmClassNames".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: ImmVersion::default(),
            release_ownership_on_finalize: default_true(),
            max_name_length: default_max_name_length(),
            admin_operation_timeout_secs: default_admin_operation_timeout(),
            ccb_flags: CcbFlags::default(),
            class_names_dn: default_class_names_dn(),
            class_names_attribute: default_class_names_attribute(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether ownership is released on admin owner finalize.
    #[must_use]
    pub fn with_release_ownership_on_finalize(mut self, release: bool) -> Self {
        self.release_ownership_on_finalize = release;
        self
    }

    /// Set the default CCB flags.
    #[must_use]
    pub fn with_ccb_flags(mut self, flags: CcbFlags) -> Self {
        self.ccb_flags = flags;
        self
    }

    /// Set the administrative operation timeout.
    #[must_use]
    pub fn with_admin_operation_timeout(mut self, secs: u64) -> Self {
        self.admin_operation_timeout_secs = secs;
        self
    }

    /// Set the maximum name length.
    #[must_use]
    pub fn with_max_name_length(mut self, len: usize) -> Self {
        self.max_name_length = len;
        self
    }

    /// Administrative operation timeout as a Duration.
    #[must_use]
    pub fn admin_operation_timeout(&self) -> Duration {
        Duration::from_secs(self.admin_operation_timeout_secs)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// [`ImmError::InvalidArgument`] describing the first invalid field.
    pub fn validate(&self) -> ImmResult<()> {
        if self.max_name_length == 0 {
            return Err(ImmError::InvalidArgument {
                message: "max_name_length must be positive".to_string(),
            });
        }
        if self.admin_operation_timeout_secs == 0 {
            return Err(ImmError::InvalidArgument {
                message: "admin_operation_timeout_secs must be positive".to_string(),
            });
        }
        if self.class_names_dn.is_empty() || self.class_names_attribute.is_empty() {
            return Err(ImmError::InvalidArgument {
                message: "class name lookup requires a DN and an attribute".to_string(),
            });
        }
        if !self.version.release_code.is_ascii_uppercase() {
            return Err(ImmError::InvalidArgument {
                message: format!("invalid release code '{}'", self.version.release_code),
            });
        }
        Ok(())
    }
}
