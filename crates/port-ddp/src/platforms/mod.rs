pub mod slack;

use port_core::flow::Platform;

pub use slack::SlackPlatform;

/// Every supported platform, in the order the flow visits them.
pub fn all_platforms() -> Vec<Box<dyn Platform>> {
    vec![Box::new(SlackPlatform)]
}

/// Looks a platform up by name, ignoring case.
pub fn platform_by_name(name: &str) -> Option<Box<dyn Platform>> {
    all_platforms()
        .into_iter()
        .find(|platform| platform.name().eq_ignore_ascii_case(name))
}

pub fn platform_names() -> Vec<String> {
    all_platforms()
        .iter()
        .map(|platform| platform.name().to_string())
        .collect()
}
