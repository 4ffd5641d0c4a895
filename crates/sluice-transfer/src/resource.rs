//! Resource name helpers.

/// Parent resource for a project, optionally scoped to a location.
pub fn parent(project_id: &str, location: Option<&str>) -> String {
  match location {
    Some(location) => format!("projects/{}/locations/{}", project_id, location),
    None => format!("projects/{}", project_id),
  }
}

/// Full resource name of a transfer configuration.
pub fn transfer_config_name(
  project_id: &str,
  location: Option<&str>,
  transfer_config_id: &str,
) -> String {
  format!(
    "{}/transferConfigs/{}",
    parent(project_id, location),
    transfer_config_id
  )
}

/// Full resource name of a transfer run.
pub fn run_name(
  project_id: &str,
  location: Option<&str>,
  transfer_config_id: &str,
  run_id: &str,
) -> String {
  format!(
    "{}/runs/{}",
    transfer_config_name(project_id, location, transfer_config_id),
    run_id
  )
}

/// Trailing identifier of a resource name.
///
/// Returns `None` when the name is empty or ends with a separator.
pub fn object_id(name: &str) -> Option<&str> {
  let id = name.rsplit('/').next()?;
  if id.is_empty() { None } else { Some(id) }
}
