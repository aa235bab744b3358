//! On-disk ring-buffer sample cache (spec §6 "Cache layout"): one directory
//! per cluster-context, one append-only ring file per metric, fixed-width
//! `(unix_ts: i64, value: f64)` records, durable via write-to-temp-and-rename.

use std::path::{Path, PathBuf};

const RECORD_SIZE: usize = 16;
const RING_CAP_BYTES: usize = 1024 * 1024;
const MAX_RECORDS: usize = RING_CAP_BYTES / RECORD_SIZE;

pub struct SampleCache {
    dir: PathBuf,
}

impl SampleCache {
    pub fn new(cache_dir: &Path, cluster_context: &str) -> Self {
        Self {
            dir: cache_dir.join(sanitize(cluster_context)),
        }
    }

    fn metric_path(&self, metric_key: &str) -> PathBuf {
        self.dir.join(format!("{}.ring", sanitize(metric_key)))
    }

    pub fn read_samples(&self, metric_key: &str) -> Vec<(i64, f64)> {
        let path = self.metric_path(metric_key);
        let Ok(bytes) = std::fs::read(&path) else { return Vec::new() };
        decode(&bytes)
    }

    /// Appends one sample, truncating to the most recent `MAX_RECORDS`, and
    /// durably replaces the file via write-to-temp-then-rename.
    pub fn append_sample(&self, metric_key: &str, unix_ts: i64, value: f64) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut samples = self.read_samples(metric_key);
        samples.push((unix_ts, value));
        if samples.len() > MAX_RECORDS {
            let overflow = samples.len() - MAX_RECORDS;
            samples.drain(0..overflow);
        }

        let bytes = encode(&samples);
        let final_path = self.metric_path(metric_key);
        let tmp_path = final_path.with_extension("ring.tmp");
        std::fs::write(&tmp_path, &bytes)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }
}

fn encode(samples: &[(i64, f64)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * RECORD_SIZE);
    for (ts, value) in samples {
        out.extend_from_slice(&ts.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn decode(bytes: &[u8]) -> Vec<(i64, f64)> {
    bytes
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| {
            let ts = i64::from_le_bytes(chunk[0..8].try_into().unwrap());
            let value = f64::from_le_bytes(chunk[8..16].try_into().unwrap());
            (ts, value)
        })
        .collect()
}

fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_samples() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SampleCache::new(dir.path(), "kind-dev");
        cache.append_sample("Pod/ns/app/cpu", 1000, 0.42).unwrap();
        cache.append_sample("Pod/ns/app/cpu", 1060, 0.50).unwrap();
        let samples = cache.read_samples("Pod/ns/app/cpu");
        assert_eq!(samples, vec![(1000, 0.42), (1060, 0.50)]);
    }

    #[test]
    fn ring_caps_at_max_records() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SampleCache::new(dir.path(), "ctx");
        for i in 0..(MAX_RECORDS + 10) {
            cache.append_sample("metric", i as i64, i as f64).unwrap();
        }
        let samples = cache.read_samples("metric");
        assert_eq!(samples.len(), MAX_RECORDS);
        assert_eq!(samples[0].0, 10);
    }
}
