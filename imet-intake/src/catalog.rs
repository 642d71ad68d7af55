//! Named provider services
//!
//! Compiled-in catalog of the lookup services operators pick from. Ids and
//! prices are upstream-defined; the list is a convenience, not the full
//! upstream offering (any service id can still be passed explicitly).

use serde::Serialize;

/// Metadata for one provider service
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServiceMeta {
    /// Stable request-facing key (camelCase, used as `serviceKey`)
    pub key: &'static str,
    /// Upstream service id
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Upstream list price in USD, as published
    pub price: &'static str,
}

pub const PROVIDER_SERVICES: [ServiceMeta; 6] = [
    ServiceMeta {
        key: "brandModelInfo",
        id: "203",
        name: "Brand & Model Info",
        description: "Cheapest brand/model identifier. Good for quick device classification.",
        price: "0.02",
    },
    ServiceMeta {
        key: "appleBasicInfo",
        id: "30",
        name: "Apple Basic Info",
        description: "Basic Apple info including iCloud lock, purchase country, warranty, etc.",
        price: "0.05",
    },
    ServiceMeta {
        key: "samsungInfo",
        id: "80",
        name: "Samsung Info",
        description: "Warranty and country/carrier information for Samsung devices.",
        price: "0.06",
    },
    ServiceMeta {
        key: "gsmaBlacklist",
        id: "6",
        name: "GSMA Blacklist Status",
        description: "Worldwide blacklist check for any IMEI.",
        price: "0.12",
    },
    ServiceMeta {
        key: "iphoneCarrierFmi",
        id: "78",
        name: "iPhone Carrier & FMI",
        description: "Carrier and FMI (Find My iPhone) status for iPhones (instant).",
        price: "0.08",
    },
    ServiceMeta {
        key: "iphoneCarrierFmiBlacklist",
        id: "61",
        name: "iPhone Carrier & FMI & Blacklist",
        description: "Carrier, FMI, and blacklist info for iPhones (instant).",
        price: "0.07",
    },
];

pub fn service_meta_by_id(service_id: &str) -> Option<&'static ServiceMeta> {
    PROVIDER_SERVICES.iter().find(|s| s.id == service_id)
}

pub fn service_meta_by_key(key: &str) -> Option<&'static ServiceMeta> {
    PROVIDER_SERVICES.iter().find(|s| s.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let meta = service_meta_by_id("203").unwrap();
        assert_eq!(meta.name, "Brand & Model Info");
        assert!(service_meta_by_id("999").is_none());
    }

    #[test]
    fn lookup_by_key() {
        let meta = service_meta_by_key("appleBasicInfo").unwrap();
        assert_eq!(meta.id, "30");
        assert!(service_meta_by_key("Apple Basic Info").is_none());
    }

    #[test]
    fn ids_are_unique() {
        for (i, a) in PROVIDER_SERVICES.iter().enumerate() {
            for b in PROVIDER_SERVICES.iter().skip(i + 1) {
                assert_ne!(a.id, b.id);
                assert_ne!(a.key, b.key);
            }
        }
    }
}
