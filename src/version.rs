use std::cmp::Ordering;

/// Version parsed from a tag name such as `v1.4.0` or `2024.10.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub original: String,
    pub parsed: VersionType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionType {
    Semantic(semver::Version),
    Numeric(Vec<u64>),
}

impl Version {
    /// Returns `None` when the tag does not look like a version at all.
    pub fn parse(tag: &str) -> Option<Self> {
        let trimmed = tag.trim();
        let bare = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let parsed = if let Ok(v) = semver::Version::parse(bare) {
            VersionType::Semantic(v)
        } else {
            VersionType::Numeric(Self::parse_numeric(bare)?)
        };

        Some(Version {
            original: tag.to_string(),
            parsed,
        })
    }

    fn parse_numeric(version: &str) -> Option<Vec<u64>> {
        let mut numbers = Vec::new();

        for part in version.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            numbers.push(part.parse::<u64>().ok()?);
        }

        if numbers.is_empty() {
            None
        } else {
            Some(numbers)
        }
    }

    fn release_parts(&self) -> Vec<u64> {
        match &self.parsed {
            VersionType::Semantic(v) => vec![v.major, v.minor, v.patch],
            VersionType::Numeric(parts) => parts.clone(),
        }
    }

    pub fn is_prerelease(&self) -> bool {
        matches!(&self.parsed, VersionType::Semantic(v) if !v.pre.is_empty())
    }

    /// Check if `self` is strictly newer than `other`
    pub fn is_newer_than(&self, other: &Version) -> bool {
        self.precedence(other) == Ordering::Greater
    }

    /// Ordering by version numbers alone; `v1.0.0` and `1.0.0` are equal here.
    fn precedence(&self, other: &Version) -> Ordering {
        match (&self.parsed, &other.parsed) {
            (VersionType::Semantic(a), VersionType::Semantic(b)) => a.cmp_precedence(b),
            _ => compare_padded(&self.release_parts(), &other.release_parts()).then_with(|| {
                // A pre-release sorts below the plain release with the same numbers.
                other.is_prerelease().cmp(&self.is_prerelease())
            }),
        }
    }
}

fn compare_padded(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let av = a.get(i).copied().unwrap_or(0);
        let bv = b.get(i).copied().unwrap_or(0);
        match av.cmp(&bv) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence(other)
            .then_with(|| self.original.cmp(&other.original))
    }
}
