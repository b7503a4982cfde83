//! Attribute catalogue for the `rightscale_instance` resource.
//!
//! Only the names and value sets the reconciliation engine needs are kept
//! here; descriptions and type information live with the host framework.

/// Cloud the instance is launched in.
pub const CLOUD_HREF: &str = "cloud_href";
/// Nested block of cloud vendor specific settings.
pub const CLOUD_SPECIFIC_ATTRIBUTES: &str = "cloud_specific_attributes";
/// Inputs applied when an instance is incarnated from a server template.
pub const INPUTS: &str = "inputs";
/// Key wrapping the projected fields in a request.
pub const INSTANCE: &str = "instance";
/// Lock protection flag.
pub const LOCKED: &str = "locked";

/// Attributes accepted when launching a raw instance.
pub const CREATE_FIELDS: &[&str] = &[
    "associate_public_ip_address",
    "datacenter_href",
    "deployment_href",
    "image_href",
    "instance_type_href",
    "ip_forwarding_enabled",
    "kernel_image_href",
    "name",
    "placement_group_href",
    "ramdisk_image_href",
    "security_group_hrefs",
    "ssh_key_href",
    "subnet_hrefs",
    "user_data",
    "server_template_href",
    "private_ip_address",
];

/// Attributes accepted when updating an existing instance.
pub const UPDATE_FIELDS: &[&str] = &["deployment_href"];

/// Attributes accepted in the `instance` block of derived resource kinds.
pub const DERIVED_FIELDS: &[&str] = &[
    "associate_public_ip_address",
    "datacenter_href",
    "deployment_href",
    "image_href",
    "instance_type_href",
    "ip_forwarding_enabled",
    "kernel_image_href",
    "name",
    "placement_group_href",
    "ramdisk_image_href",
    "security_group_hrefs",
    "ssh_key_href",
    "subnet_hrefs",
    "user_data",
    "server_template_href",
    CLOUD_HREF,
    "private_ip_address",
];

const BOOLEAN_STRINGS: &[&str] = &["true", "false"];

/// Cloud specific keys whose values are restricted to a fixed set.
pub const RESTRICTED_CLOUD_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("automatic_instance_store_mapping", BOOLEAN_STRINGS),
    ("create_boot_volume", BOOLEAN_STRINGS),
    ("create_default_port_forwarding_rules", BOOLEAN_STRINGS),
    ("delete_boot_volume", BOOLEAN_STRINGS),
    ("ebs_optimized", BOOLEAN_STRINGS),
    ("placement_tenancy", &["default", "dedicated"]),
    ("preemptible", BOOLEAN_STRINGS),
    ("pricing_type", &["fixed", "spot"]),
];

/// Every key accepted inside the cloud specific attributes block.
pub const CLOUD_ATTRIBUTE_KEYS: &[&str] = &[
    "admin_username",
    "automatic_instance_store_mapping",
    "availability_set",
    "create_boot_volume",
    "create_default_port_forwarding_rules",
    "delete_boot_volume",
    "disk_gb",
    "ebs_optimized",
    "iam_instance_profile",
    "keep_alive_id",
    "keep_alive_url",
    "local_ssd_count",
    "local_ssd_interface",
    "max_spot_price",
    "memory_mb",
    "metadata",
    "num_cores",
    "placement_tenancy",
    "preemptible",
    "pricing_type",
    "root_volume_performance",
    "root_volume_size",
    "root_volume_type_uid",
    "service_account",
];

/// Returns the allowed values for a restricted cloud specific key.
#[must_use]
pub fn allowed_cloud_values(key: &str) -> Option<&'static [&'static str]> {
    RESTRICTED_CLOUD_ATTRIBUTES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, values)| *values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_fields_exclude_creation_only_attributes() {
        for creation_only in ["server_template_href", INPUTS, LOCKED] {
            assert!(
                !UPDATE_FIELDS.contains(&creation_only),
                "{creation_only} must not be updatable"
            );
        }
        for field in UPDATE_FIELDS {
            assert!(CREATE_FIELDS.contains(field), "{field} missing from create");
        }
    }

    #[test]
    fn lock_flag_is_never_projected() {
        assert!(!CREATE_FIELDS.contains(&LOCKED));
        assert!(!DERIVED_FIELDS.contains(&LOCKED));
    }

    #[test]
    fn restricted_keys_are_known_cloud_keys() {
        for (key, _) in RESTRICTED_CLOUD_ATTRIBUTES {
            assert!(CLOUD_ATTRIBUTE_KEYS.contains(key), "unknown key {key}");
        }
        assert_eq!(
            allowed_cloud_values("placement_tenancy"),
            Some(&["default", "dedicated"][..])
        );
        assert_eq!(allowed_cloud_values("metadata"), None);
    }
}
