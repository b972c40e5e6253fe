#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Jira API request failed [{status}]: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected Jira response: {0}")]
    Decode(String),
}
