//! Build configuration points
//!
//! One point is one rebuild of the profiler. Its fields become CMake cache
//! definitions and decide which report lines the resulting binary prints.

use crate::error::{EngineError, EngineResult};
use crate::extract::{ProfilerSignal, TrackedSignal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CMake build type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildType {
    #[default]
    Release,
    Debug,
    RelWithDebInfo,
}

impl BuildType {
    pub fn as_cmake(&self) -> &'static str {
        match self {
            Self::Release => "Release",
            Self::Debug => "Debug",
            Self::RelWithDebInfo => "RelWithDebInfo",
        }
    }
}

/// Hash function compiled into the profiler's transfer table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Meowhash,
    Rapidhash,
    T1ha0,
    #[default]
    Xxh3,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [Self::Meowhash, Self::Rapidhash, Self::T1ha0, Self::Xxh3];

    /// Value of the `HASH_FUNCTION` cache entry
    pub fn as_cmake(&self) -> &'static str {
        match self {
            Self::Meowhash => "MEOWHASH",
            Self::Rapidhash => "RAPIDHASH",
            Self::T1ha0 => "T1HA0",
            Self::Xxh3 => "XXH3",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Meowhash => "meowhash",
            Self::Rapidhash => "rapidhash",
            Self::T1ha0 => "t1ha0",
            Self::Xxh3 => "xxh3",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One set of build parameters for the instrumented target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationPoint {
    /// Unique name, used as the configuration key in result tables
    pub label: String,
    #[serde(default)]
    pub build_type: BuildType,
    #[serde(default)]
    pub collision_checking: bool,
    #[serde(default)]
    pub measure_hashing_overhead: bool,
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    #[serde(default)]
    pub print_transfer_rate: bool,
    /// Additional `-D` definitions passed through unchanged
    #[serde(default)]
    pub extra_definitions: BTreeMap<String, String>,
}

impl ConfigurationPoint {
    /// Release build, every optional report off
    pub fn release(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            build_type: BuildType::Release,
            collision_checking: false,
            measure_hashing_overhead: false,
            hash_algorithm: HashAlgorithm::default(),
            print_transfer_rate: false,
            extra_definitions: BTreeMap::new(),
        }
    }

    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    pub fn with_collision_checking(mut self) -> Self {
        self.collision_checking = true;
        self
    }

    pub fn with_hashing_overhead(mut self) -> Self {
        self.measure_hashing_overhead = true;
        self
    }

    pub fn with_transfer_rate(mut self) -> Self {
        self.print_transfer_rate = true;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.label.trim().is_empty() {
            return Err(EngineError::invalid_configuration(
                &self.label,
                "label must not be empty",
            ));
        }
        if let Some(key) = self
            .extra_definitions
            .keys()
            .find(|k| k.is_empty() || k.contains(char::is_whitespace) || k.contains('='))
        {
            return Err(EngineError::invalid_configuration(
                &self.label,
                format!("'{}' is not a valid cache variable name", key),
            ));
        }
        Ok(())
    }

    /// Cache definitions in `NAME=VALUE` form, fixed fields first
    pub fn definitions(&self) -> Vec<(String, String)> {
        let on_off = |flag: bool| (if flag { "ON" } else { "OFF" }).to_string();
        let mut defs = vec![
            (
                "CMAKE_BUILD_TYPE".to_string(),
                self.build_type.as_cmake().to_string(),
            ),
            (
                "ENABLE_COLLISION_CHECKING".to_string(),
                on_off(self.collision_checking),
            ),
            (
                "MEASURE_HASHING_OVERHEAD".to_string(),
                on_off(self.measure_hashing_overhead),
            ),
            (
                "HASH_FUNCTION".to_string(),
                self.hash_algorithm.as_cmake().to_string(),
            ),
            (
                "PRINT_TRANSFER_RATE".to_string(),
                on_off(self.print_transfer_rate),
            ),
        ];
        defs.extend(
            self.extra_definitions
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        defs
    }

    /// `-DNAME=VALUE` arguments for the configure step
    pub fn cmake_args(&self) -> Vec<String> {
        self.definitions()
            .into_iter()
            .map(|(k, v)| format!("-D{}={}", k, v))
            .collect()
    }

    /// Report lines a profiler built with this point prints
    pub fn profiler_signals(&self) -> Vec<ProfilerSignal> {
        let mut signals = ProfilerSignal::ALWAYS.to_vec();
        if self.measure_hashing_overhead {
            signals.extend([ProfilerSignal::HashOverhead, ProfilerSignal::HashRate]);
        }
        if self.collision_checking {
            signals.extend([ProfilerSignal::Collisions, ProfilerSignal::CollisionRate]);
        }
        if self.print_transfer_rate {
            signals.push(ProfilerSignal::TransferRate);
        }
        signals
    }

    pub fn tracked_signals(&self) -> Vec<TrackedSignal> {
        self.profiler_signals().iter().map(|s| s.tracked()).collect()
    }
}

impl std::fmt::Display for ConfigurationPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// The stock sweep: overhead run, per-algorithm hashing cost, per-algorithm
/// collisions, then transfer rate
pub fn default_points() -> Vec<ConfigurationPoint> {
    let mut points = vec![ConfigurationPoint::release("release")];
    points.extend(HashAlgorithm::ALL.into_iter().map(|alg| {
        ConfigurationPoint::release(format!("hash-{}", alg))
            .with_hash_algorithm(alg)
            .with_hashing_overhead()
    }));
    points.extend(HashAlgorithm::ALL.into_iter().map(|alg| {
        ConfigurationPoint::release(format!("collisions-{}", alg))
            .with_hash_algorithm(alg)
            .with_collision_checking()
    }));
    points.push(ConfigurationPoint::release("transfer-rate").with_transfer_rate());
    points
}

/// Reject empty labels, bad definitions and duplicate labels
pub fn validate_points(points: &[ConfigurationPoint]) -> EngineResult<()> {
    for (i, point) in points.iter().enumerate() {
        point.validate()?;
        if points[..i].iter().any(|p| p.label == point.label) {
            return Err(EngineError::invalid_configuration(
                &point.label,
                "label is used twice",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points() {
        let points = default_points();
        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "release",
                "hash-meowhash",
                "hash-rapidhash",
                "hash-t1ha0",
                "hash-xxh3",
                "collisions-meowhash",
                "collisions-rapidhash",
                "collisions-t1ha0",
                "collisions-xxh3",
                "transfer-rate",
            ]
        );
        assert!(validate_points(&points).is_ok());
    }

    #[test]
    fn test_cmake_args() {
        let point = ConfigurationPoint::release("collisions-t1ha0")
            .with_hash_algorithm(HashAlgorithm::T1ha0)
            .with_collision_checking();
        assert_eq!(
            point.cmake_args(),
            vec![
                "-DCMAKE_BUILD_TYPE=Release",
                "-DENABLE_COLLISION_CHECKING=ON",
                "-DMEASURE_HASHING_OVERHEAD=OFF",
                "-DHASH_FUNCTION=T1HA0",
                "-DPRINT_TRANSFER_RATE=OFF",
            ]
        );
    }

    #[test]
    fn test_signals_follow_toggles() {
        let release = ConfigurationPoint::release("release");
        assert_eq!(release.profiler_signals().len(), ProfilerSignal::ALWAYS.len());

        let hashed = ConfigurationPoint::release("h").with_hashing_overhead();
        assert!(hashed.profiler_signals().contains(&ProfilerSignal::HashRate));
        assert!(!hashed.profiler_signals().contains(&ProfilerSignal::Collisions));

        let transfer = ConfigurationPoint::release("t").with_transfer_rate();
        let names: Vec<String> = transfer.tracked_signals().into_iter().map(|s| s.name).collect();
        assert!(names.contains(&"transfer_rate".to_string()));
    }

    #[test]
    fn test_parse_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            configurations: Vec<ConfigurationPoint>,
        }
        let toml_str = r#"
[[configurations]]
label = "debug-rapidhash"
build_type = "Debug"
hash_algorithm = "rapidhash"
collision_checking = true

[configurations.extra_definitions]
OMPT_VERBOSE = "1"
"#;
        let parsed: Wrapper = toml::from_str(toml_str).unwrap();
        let point = &parsed.configurations[0];
        assert_eq!(point.build_type, BuildType::Debug);
        assert_eq!(point.hash_algorithm, HashAlgorithm::Rapidhash);
        assert!(point.collision_checking);
        assert!(!point.print_transfer_rate);
        assert_eq!(point.cmake_args().last().unwrap(), "-DOMPT_VERBOSE=1");
    }

    #[test]
    fn test_validation() {
        let mut bad = ConfigurationPoint::release("x");
        bad.extra_definitions
            .insert("HAS SPACE".to_string(), "1".to_string());
        assert!(bad.validate().is_err());

        assert!(ConfigurationPoint::release(" ").validate().is_err());

        let dup = vec![
            ConfigurationPoint::release("a"),
            ConfigurationPoint::release("a"),
        ];
        assert!(matches!(
            validate_points(&dup),
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }
}
