//! IPv4 CIDR validation shared by the ACL-bearing resources

/// Checks `value` is an IPv4 CIDR: four octets in range and a prefix
/// length of 0-32.
pub fn is_valid_cidr(value: &str) -> bool {
    let Some((address, prefix)) = value.split_once('/') else {
        return false;
    };

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => {}
        _ => return false,
    }

    let octets: Vec<&str> = address.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    octets.iter().all(|octet| {
        !octet.is_empty()
            && octet.len() <= 3
            && octet.chars().all(|c| c.is_ascii_digit())
            && octet.parse::<u16>().map(|n| n <= 255).unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_cidrs() {
        assert!(is_valid_cidr("10.0.0.0/24"));
        assert!(is_valid_cidr("192.168.1.0/28"));
        assert!(is_valid_cidr("0.0.0.0/0"));
        assert!(is_valid_cidr("255.255.255.255/32"));
    }

    #[test]
    fn rejects_malformed_cidrs() {
        assert!(!is_valid_cidr("10.0.0.0"));
        assert!(!is_valid_cidr("10.0.0/24"));
        assert!(!is_valid_cidr("10.0.0.256/24"));
        assert!(!is_valid_cidr("10.0.0.0/33"));
        assert!(!is_valid_cidr("10.0.0.0/-1"));
        assert!(!is_valid_cidr("ten.0.0.0/24"));
        assert!(!is_valid_cidr(""));
    }
}
