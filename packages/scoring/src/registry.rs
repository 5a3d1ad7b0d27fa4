//! Compile-time registry of weight profiles.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a profile requires creating a TOML file in `profiles/` and adding
//! a corresponding entry here.

use smart_city_city_models::WeightProfile;

/// Number of registered profiles. Enforced by a test.
#[cfg(test)]
const EXPECTED_PROFILE_COUNT: usize = 2;

/// Embedded TOML profile definitions, in menu order.
const PROFILE_TOMLS: &[(&str, &str)] = &[
    ("individual", include_str!("../profiles/individual.toml")),
    ("business", include_str!("../profiles/business.toml")),
];

/// Returns all registered weight profiles in menu order.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. These are compile-time
/// constants, so a failure is a development error caught by the tests.
#[must_use]
pub fn all_profiles() -> Vec<WeightProfile> {
    PROFILE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse weight profile '{name}': {e}"))
        })
        .collect()
}

/// Looks up a profile by id.
#[must_use]
pub fn profile(id: &str) -> Option<WeightProfile> {
    all_profiles().into_iter().find(|p| p.id == id)
}
