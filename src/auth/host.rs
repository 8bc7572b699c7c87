//! Host derivation from account identifiers.

/// Domain serving account REST endpoints.
pub const ACCOUNT_DOMAIN: &str = "snowflakecomputing.com";

/// `<account>.snowflakecomputing.com`, with the account lowercased.
///
/// Account locators that already carry a region (`xy12345.us-west-2`) are
/// used as-is.
pub fn account_host(account: &str) -> String {
    format!("{}.{ACCOUNT_DOMAIN}", account.trim().to_lowercase())
}

/// Host from an account and a region as reported by the session.
///
/// `PUBLIC.AWS_US_WEST_2` becomes `<account>.us-west-2.snowflakecomputing.com`.
/// A region without a group prefix falls back to [`account_host`].
pub fn region_host(account: &str, region: &str) -> String {
    let Some((_, cloud_region)) = region.rsplit_once('.') else {
        return account_host(account);
    };
    let cloud_region = cloud_region.to_lowercase().replace('_', "-");
    let cloud_region = cloud_region
        .strip_prefix("aws-")
        .unwrap_or(&cloud_region);
    format!(
        "{}.{cloud_region}.{ACCOUNT_DOMAIN}",
        account.trim().to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_host_lowercases() {
        assert_eq!(account_host("XY12345"), "xy12345.snowflakecomputing.com");
        assert_eq!(
            account_host("xy12345.us-west-2"),
            "xy12345.us-west-2.snowflakecomputing.com"
        );
    }

    #[test]
    fn region_host_strips_aws_prefix() {
        assert_eq!(
            region_host("MYACCT", "PUBLIC.AWS_US_WEST_2"),
            "myacct.us-west-2.snowflakecomputing.com"
        );
    }

    #[test]
    fn region_host_keeps_other_clouds() {
        assert_eq!(
            region_host("acct", "PUBLIC.AZURE_EASTUS2"),
            "acct.azure-eastus2.snowflakecomputing.com"
        );
    }

    #[test]
    fn region_without_group_falls_back() {
        assert_eq!(region_host("acct", "AWS_US_EAST_1"), account_host("acct"));
    }
}
