//! The structured parameter set extracted from a query.
//!
//! Values only enter a [`ParameterSet`] through the `with_*` builders, which
//! run the raw token through the normalizer first. A set therefore never holds
//! an unnormalized token, and "changing" a value yields a new set.

use crate::normalizer::{self, NormalizationMiss};
use serde::{Serialize, Serializer};

/// The keys a parameter set recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Service,
    Region,
    InstanceType,
    Os,
}

impl ParamKey {
    pub const ALL: [ParamKey; 4] = [Self::Service, Self::Region, Self::InstanceType, Self::Os];

    /// The key as it appears in tool arguments and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Region => "region",
            Self::InstanceType => "instance_type",
            Self::Os => "os",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced service. Compute is the only one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Service {
    #[default]
    Ec2,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ec2 => "EC2",
        }
    }

    /// Service code in the price catalog.
    pub fn service_code(&self) -> &'static str {
        match self {
            Self::Ec2 => "AmazonEC2",
        }
    }

    fn from_canonical(id: &str) -> Option<Self> {
        (id == "EC2").then_some(Self::Ec2)
    }
}

impl Serialize for Service {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Normalized query parameters. Absent fields mean "unspecified".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterSet {
    service: Service,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    os: Option<String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(self, raw: &str) -> Result<Self, NormalizationMiss> {
        let id = normalizer::normalize(ParamKey::Service, raw)?;
        Ok(Self {
            service: Service::from_canonical(&id).unwrap_or_default(),
            ..self
        })
    }

    pub fn with_region(self, raw: &str) -> Result<Self, NormalizationMiss> {
        let region = normalizer::normalize(ParamKey::Region, raw)?;
        Ok(Self {
            region: Some(region),
            ..self
        })
    }

    pub fn with_instance_type(self, raw: &str) -> Result<Self, NormalizationMiss> {
        let instance_type = normalizer::normalize(ParamKey::InstanceType, raw)?;
        Ok(Self {
            instance_type: Some(instance_type),
            ..self
        })
    }

    pub fn with_os(self, raw: &str) -> Result<Self, NormalizationMiss> {
        let os = normalizer::normalize(ParamKey::Os, raw)?;
        Ok(Self {
            os: Some(os),
            ..self
        })
    }

    /// Set `key` from a raw token.
    pub fn with(self, key: ParamKey, raw: &str) -> Result<Self, NormalizationMiss> {
        match key {
            ParamKey::Service => self.with_service(raw),
            ParamKey::Region => self.with_region(raw),
            ParamKey::InstanceType => self.with_instance_type(raw),
            ParamKey::Os => self.with_os(raw),
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn instance_type(&self) -> Option<&str> {
        self.instance_type.as_deref()
    }

    pub fn os(&self) -> Option<&str> {
        self.os.as_deref()
    }

    /// The filterable fields that are present, in a fixed order.
    pub fn recognized(&self) -> Vec<(ParamKey, &str)> {
        [
            (ParamKey::Region, self.region()),
            (ParamKey::InstanceType, self.instance_type()),
            (ParamKey::Os, self.os()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }

    /// True when none of region, instance type, or OS is present.
    pub fn is_unspecified(&self) -> bool {
        self.region.is_none() && self.instance_type.is_none() && self.os.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_normalize() {
        let params = ParameterSet::new()
            .with_region("東京")
            .and_then(|p| p.with_instance_type("T2.micro"))
            .and_then(|p| p.with_os("linux"))
            .unwrap();

        assert_eq!(params.region(), Some("ap-northeast-1"));
        assert_eq!(params.instance_type(), Some("t2.micro"));
        assert_eq!(params.os(), Some("Linux"));
        assert_eq!(params.service(), Service::Ec2);
    }

    #[test]
    fn miss_leaves_original_untouched() {
        let params = ParameterSet::new().with_os("Linux").unwrap();
        let copy = params.clone();
        assert!(copy.with_region("Atlantis").is_err());
        assert_eq!(params.os(), Some("Linux"));
        assert!(params.region().is_none());
    }

    #[test]
    fn serializes_present_fields_only() {
        let params = ParameterSet::new().with_region("Tokyo").unwrap();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"service": "EC2", "region": "ap-northeast-1"})
        );
    }

    #[test]
    fn service_is_not_a_recognized_field() {
        let params = ParameterSet::new().with_service("ec2").unwrap();
        assert!(params.is_unspecified());
        assert!(params.recognized().is_empty());
        assert_eq!(params.service().service_code(), "AmazonEC2");
    }

    #[test]
    fn recognized_order_is_fixed() {
        let params = ParameterSet::new()
            .with(ParamKey::Os, "windows")
            .and_then(|p| p.with(ParamKey::Region, "Seoul"))
            .unwrap();
        let keys: Vec<ParamKey> = params.recognized().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![ParamKey::Region, ParamKey::Os]);
    }

    #[test]
    fn key_names() {
        assert_eq!(ParamKey::from_name("instance_type"), Some(ParamKey::InstanceType));
        assert_eq!(ParamKey::from_name("operating_system"), None);
        assert_eq!(ParamKey::Os.to_string(), "os");
    }
}
