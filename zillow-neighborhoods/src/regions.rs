//! Régions (États américains) à importer

/// Une région: abréviation postale et nom affiché
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub abbrev: &'static str,
    pub name: &'static str,
}

impl Region {
    pub const fn new(abbrev: &'static str, name: &'static str) -> Self {
        Self { abbrev, name }
    }
}

/// Les 50 États et le District of Columbia, triés par nom
pub const US_STATES: &[Region] = &[
    Region::new("AL", "Alabama"),
    Region::new("AK", "Alaska"),
    Region::new("AZ", "Arizona"),
    Region::new("AR", "Arkansas"),
    Region::new("CA", "California"),
    Region::new("CO", "Colorado"),
    Region::new("CT", "Connecticut"),
    Region::new("DE", "Delaware"),
    Region::new("DC", "District of Columbia"),
    Region::new("FL", "Florida"),
    Region::new("GA", "Georgia"),
    Region::new("HI", "Hawaii"),
    Region::new("ID", "Idaho"),
    Region::new("IL", "Illinois"),
    Region::new("IN", "Indiana"),
    Region::new("IA", "Iowa"),
    Region::new("KS", "Kansas"),
    Region::new("KY", "Kentucky"),
    Region::new("LA", "Louisiana"),
    Region::new("ME", "Maine"),
    Region::new("MD", "Maryland"),
    Region::new("MA", "Massachusetts"),
    Region::new("MI", "Michigan"),
    Region::new("MN", "Minnesota"),
    Region::new("MS", "Mississippi"),
    Region::new("MO", "Missouri"),
    Region::new("MT", "Montana"),
    Region::new("NE", "Nebraska"),
    Region::new("NV", "Nevada"),
    Region::new("NH", "New Hampshire"),
    Region::new("NJ", "New Jersey"),
    Region::new("NM", "New Mexico"),
    Region::new("NY", "New York"),
    Region::new("NC", "North Carolina"),
    Region::new("ND", "North Dakota"),
    Region::new("OH", "Ohio"),
    Region::new("OK", "Oklahoma"),
    Region::new("OR", "Oregon"),
    Region::new("PA", "Pennsylvania"),
    Region::new("RI", "Rhode Island"),
    Region::new("SC", "South Carolina"),
    Region::new("SD", "South Dakota"),
    Region::new("TN", "Tennessee"),
    Region::new("TX", "Texas"),
    Region::new("UT", "Utah"),
    Region::new("VT", "Vermont"),
    Region::new("VA", "Virginia"),
    Region::new("WA", "Washington"),
    Region::new("WV", "West Virginia"),
    Region::new("WI", "Wisconsin"),
    Region::new("WY", "Wyoming"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_states_sorted_and_unique() {
        assert_eq!(US_STATES.len(), 51);
        assert!(US_STATES.windows(2).all(|w| w[0].name < w[1].name));

        let mut abbrevs: Vec<&str> = US_STATES.iter().map(|r| r.abbrev).collect();
        abbrevs.sort_unstable();
        abbrevs.dedup();
        assert_eq!(abbrevs.len(), 51);
        assert!(abbrevs.iter().all(|a| a.len() == 2));
    }

    #[test]
    fn test_delaware_present() {
        assert!(US_STATES.contains(&Region::new("DE", "Delaware")));
    }
}
