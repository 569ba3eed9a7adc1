//! Lens capability enumeration.

use crate::errors::CaptureError;
use crate::platform::CameraPlatform;
use crate::types::{LensCapability, LensDirection, LensSelector, QualityTier};

/// Query the host for every requested lens direction and build the catalog.
///
/// Directions are visited in catalog order (back, front, external) and only
/// the first lens of each direction is used. Each lens is activated, read and
/// released before the next one is touched: the host grants the hardware to
/// one opener at a time.
pub fn refresh(
    platform: &dyn CameraPlatform,
    lens_directions: &[LensDirection],
) -> Result<Vec<LensCapability>, CaptureError> {
    let lenses = platform.list_lenses().map_err(|e| {
        log::error!("Failed to list lenses: {}", e);
        CaptureError::from(e)
    })?;

    let mut catalog = Vec::new();
    for direction in LensDirection::ALL {
        if !lens_directions.contains(&direction) {
            continue;
        }
        let Some(lens) = lenses.iter().find(|l| l.direction == direction) else {
            log::debug!("No {} lens reported", direction);
            continue;
        };

        match probe(platform, lens) {
            Ok(capability) => catalog.push(capability),
            Err(e) => log::warn!("Skipping {} lens {}: {}", direction, lens.id, e),
        }
    }

    if catalog.is_empty() {
        log::error!("No usable lens among {:?}", lens_directions);
        return Err(CaptureError::NoCameraAvailable);
    }

    log::info!(
        "Capability catalog rebuilt: {}",
        catalog
            .iter()
            .map(|c| format!("{}={:?}", c.direction(), c.supported_qualities))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(catalog)
}

fn probe(platform: &dyn CameraPlatform, lens: &LensSelector) -> Result<LensCapability, CaptureError> {
    let info = platform.activate_lens(lens);
    platform.release_lens(lens);
    let info = info?;

    let qualities = filter_qualities(&info.quality_names);
    if qualities.is_empty() {
        log::warn!("Lens {} reports no recognized video quality", lens.id);
    }

    Ok(LensCapability::new(lens.clone(), qualities)
        .with_resolutions(info.still_resolutions)
        .with_flash_unit(info.has_flash_unit)
        .with_zoom_range(info.zoom_range))
}

/// Keep the recognized tiers in the order the platform reported them.
pub fn filter_qualities(names: &[String]) -> Vec<QualityTier> {
    let mut tiers = Vec::with_capacity(names.len());
    for name in names {
        match QualityTier::from_platform_name(name) {
            Some(tier) if !tiers.contains(&tier) => tiers.push(tier),
            Some(_) => {}
            None => log::debug!("Ignoring quality {}", name),
        }
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SimulatedLens, SimulatedPlatform};

    #[test]
    fn test_filter_preserves_platform_order() {
        let names: Vec<String> = ["HD", "LOWEST", "UHD", "HD", "SD"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            filter_qualities(&names),
            vec![QualityTier::HD, QualityTier::UHD, QualityTier::SD]
        );
    }

    #[test]
    fn test_refresh_orders_back_first() {
        let platform = SimulatedPlatform::new(vec![
            SimulatedLens::new("1", LensDirection::Front, &["HD"]),
            SimulatedLens::new("0", LensDirection::Back, &["FHD", "HD"]),
        ]);
        let catalog = refresh(&platform, &LensDirection::ALL).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].direction(), LensDirection::Back);
        assert_eq!(
            catalog[0].supported_qualities,
            vec![QualityTier::FHD, QualityTier::HD]
        );
        assert_eq!(catalog[1].supported_qualities, vec![QualityTier::HD]);
    }

    #[test]
    fn test_refresh_releases_every_lens() {
        let platform = SimulatedPlatform::with_default_lenses();
        refresh(&platform, &LensDirection::ALL).unwrap();
        let stats = platform.stats();
        assert_eq!(stats.activations, 2);
        assert_eq!(stats.releases, 2);
        assert_eq!(stats.concurrent_activation_errors, 0);
    }

    #[test]
    fn test_refresh_respects_requested_directions() {
        let platform = SimulatedPlatform::with_default_lenses();
        let catalog = refresh(&platform, &[LensDirection::Front]).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].direction(), LensDirection::Front);
    }

    #[test]
    fn test_no_lenses_is_fatal() {
        let platform = SimulatedPlatform::new(vec![]);
        let err = refresh(&platform, &LensDirection::ALL).unwrap_err();
        assert_eq!(err, CaptureError::NoCameraAvailable);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_failing_lens_is_skipped() {
        let platform = SimulatedPlatform::new(vec![
            SimulatedLens::new("0", LensDirection::Back, &["FHD"]).failing_probe(),
            SimulatedLens::new("1", LensDirection::Front, &["HD"]),
        ]);
        let catalog = refresh(&platform, &LensDirection::ALL).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].direction(), LensDirection::Front);
    }
}
