use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /* CONFIGURATION ERRORS */
    #[error("cannot parse range [{input}]: {reason}")]
    RangeFormat { input: String, reason: String },
    #[error("cannot parse IPv4 address range [{input}]: {reason}")]
    AddressFormat { input: String, reason: String },
    #[error("cannot parse MAC address [{input}]")]
    MacFormat { input: String },
    #[error("ill-formed configuration file [{path}]: {reason}")]
    Config { path: String, reason: String },
    #[error("invalid nesting order: {0}")]
    Order(String),

    /* DEVICE ERRORS */
    #[error("cannot open device [{device}]: {source}")]
    DeviceOpen {
        device: String,
        #[source]
        source: pcap::Error,
    },

    /* PACKET ERRORS */
    #[error("cannot serialize packet: {reason}")]
    Serialize { reason: String },
    #[error("failed to send packet on [{device}]: {reason}")]
    Send { device: String, reason: String },
}

impl Error {
    pub(crate) fn range(input: &str, reason: impl Into<String>) -> Self {
        Error::RangeFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn address(input: &str, reason: impl Into<String>) -> Self {
        Error::AddressFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
