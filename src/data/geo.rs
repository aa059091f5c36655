//! Country code lookup: display name, continent and African sub-region.

pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryInfo {
    pub name: String,
    pub continent: String,
    pub region: String,
}

// (ISO-2, name, region). Every listed country is in Africa.
const COUNTRIES: [(&str, &str, &str); 16] = [
    ("KE", "Kenya", "East Africa"),
    ("UG", "Uganda", "East Africa"),
    ("TZ", "Tanzania", "East Africa"),
    ("NG", "Nigeria", "West Africa"),
    ("GH", "Ghana", "West Africa"),
    ("SN", "Senegal", "West Africa"),
    ("CI", "Côte d'Ivoire", "West Africa"),
    ("NE", "Niger", "West Africa"),
    ("ML", "Mali", "West Africa"),
    ("ZA", "South Africa", "Southern Africa"),
    ("ZW", "Zimbabwe", "Southern Africa"),
    ("ZM", "Zambia", "Southern Africa"),
    ("DZ", "Algeria", "North Africa"),
    ("EG", "Egypt", "North Africa"),
    ("MA", "Morocco", "North Africa"),
    ("TN", "Tunisia", "North Africa"),
];

/// Look up a country by ISO-2 code. Unknown codes keep the code as name.
pub fn country_info(code: &str) -> CountryInfo {
    let code = code.trim();
    match COUNTRIES
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code))
    {
        Some((_, name, region)) => CountryInfo {
            name: name.to_string(),
            continent: "Africa".to_string(),
            region: region.to_string(),
        },
        None => CountryInfo {
            name: code.to_string(),
            continent: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_country() {
        let info = country_info("NG");
        assert_eq!(info.name, "Nigeria");
        assert_eq!(info.continent, "Africa");
        assert_eq!(info.region, "West Africa");

        assert_eq!(country_info(" ke ").name, "Kenya");
    }

    #[test]
    fn test_unknown_country_keeps_code() {
        let info = country_info("BR");
        assert_eq!(info.name, "BR");
        assert_eq!(info.continent, UNKNOWN);
        assert_eq!(info.region, UNKNOWN);
    }
}
