/// Atlassian-related transformations
///
/// Pure transformation functions over Jira API payloads. No I/O; testable
/// with fixture data.
pub mod jira;
