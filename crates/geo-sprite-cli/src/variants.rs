use std::str::FromStr;

use anyhow::bail;

/// One resolution-variant specifier: an absolute sprite width in pixels
/// (`128`), or a tile-count multiplier resolved against the tile size
/// (`2x` = two tiles wide).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantSpec {
    Width(u32),
    Tiles(u32),
}

impl VariantSpec {
    pub fn resolve(&self, tile_size: u32) -> u32 {
        match *self {
            VariantSpec::Width(w) => w,
            VariantSpec::Tiles(n) => n.saturating_mul(tile_size),
        }
    }
}

impl FromStr for VariantSpec {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(n) = s.strip_suffix(['x', 'X']) {
            return n.parse().map(Self::Tiles).map_err(|_| ());
        }
        s.parse().map(Self::Width).map_err(|_| ())
    }
}

/// Parses a comma-separated variant list into resolved sprite widths.
pub fn parse_variants(spec: &str, tile_size: u32) -> anyhow::Result<Vec<u32>> {
    let mut widths = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let v: VariantSpec = part
            .parse()
            .map_err(|_| anyhow::anyhow!("bad resolution variant: {part}"))?;
        let w = v.resolve(tile_size);
        if w == 0 {
            bail!("resolution variant {part} resolves to zero pixels");
        }
        widths.push(w);
    }
    if widths.is_empty() {
        bail!("no resolution variants given");
    }
    Ok(widths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_widths_and_multipliers() {
        assert_eq!(parse_variants("128,256", 1024).unwrap(), vec![128, 256]);
        assert_eq!(parse_variants("2x", 1024).unwrap(), vec![2048]);
        assert_eq!(parse_variants(" 64 , 1x ", 512).unwrap(), vec![64, 512]);
    }

    #[test]
    fn rejects_garbage_and_zero() {
        assert!(parse_variants("abc", 1024).is_err());
        assert!(parse_variants("0", 1024).is_err());
        assert!(parse_variants("", 1024).is_err());
    }
}
