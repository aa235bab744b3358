//! Kubernetes resource `Quantity` string parsing: CPU strings (`"500m"`,
//! `"1"`, `"0.5"`) to millicores, memory strings (`"256Mi"`, `"1Gi"`,
//! `"512k"`) to bytes.

/// Parse a CPU quantity string (e.g. `"500m"`, `"1"`, `"0.5"`) to millicores.
pub fn parse_cpu_millicores(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(m) = s.strip_suffix('m') {
        return m.parse::<i64>().ok();
    }
    s.parse::<f64>().ok().map(|n| (n * 1000.0).round() as i64)
}

/// Parse a memory quantity string (e.g. `"256Mi"`, `"1Gi"`, `"512k"`) to bytes.
pub fn parse_memory_bytes(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let binary = s.replace('i', "");
    let (num_str, unit): (&str, i64) = if let Some(n) = binary.strip_suffix('K') {
        (n, 1024)
    } else if let Some(n) = binary.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = binary.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = binary.strip_suffix('T') {
        (n, 1024_i64 * 1024 * 1024 * 1024)
    } else if let Some(n) = binary.strip_suffix('P') {
        (n, 1024_i64 * 1024 * 1024 * 1024 * 1024)
    } else if let Ok(n) = binary.parse::<i64>() {
        return Some(n);
    } else {
        return None;
    };
    let n: i64 = num_str.parse().ok()?;
    Some(n * unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_millis() {
        assert_eq!(parse_cpu_millicores("500m"), Some(500));
        assert_eq!(parse_cpu_millicores("1"), Some(1000));
        assert_eq!(parse_cpu_millicores("0.5"), Some(500));
        assert_eq!(parse_cpu_millicores("3000"), Some(3_000_000));
    }

    #[test]
    fn memory_bytes() {
        assert_eq!(parse_memory_bytes("256Mi"), Some(256 * 1024 * 1024));
        assert_eq!(parse_memory_bytes("1Gi"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_bytes("512"), Some(512));
    }

    #[test]
    fn pvc_near_full_scenario_e() {
        // scenario E: used=950Mi, capacity=1Gi -> ~93%
        let used = parse_memory_bytes("950Mi").unwrap() as f64;
        let capacity = parse_memory_bytes("1Gi").unwrap() as f64;
        let pct = used / capacity * 100.0;
        assert!(pct >= 90.0 && pct < 94.0, "pct={pct}");
    }
}
