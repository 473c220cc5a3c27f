use crate::status::{StatusValue, Unit};
use crate::theme::VolumeIcons;

pub const VOLUME_TAG: &str = "Volume";

/// Mute flag and volume percentage, as last read from the mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeReading {
    pub muted: bool,
    pub percent: i64,
}

impl VolumeReading {
    /// `volume` is the mixer's linear level, 1.0 being 100 %.
    pub fn from_level(muted: bool, volume: f32) -> Self {
        Self {
            muted,
            percent: (f64::from(volume) * 100.0).round() as i64,
        }
    }
}

pub fn volume_icon(icons: &VolumeIcons, reading: VolumeReading) -> &str {
    if reading.muted {
        return &icons.muted;
    }
    match reading.percent {
        p if p < 16 => &icons.low,
        p if p < 50 => &icons.medium,
        _ => &icons.high,
    }
}

/// The status published before the mixer has been read.
pub fn initial_volume_status(icons: &VolumeIcons) -> StatusValue {
    StatusValue::new(VOLUME_TAG)
        .with_label(icons.low.clone())
        .with_value(0_i64)
        .with_format("{:>3}")
        .with_unit(Unit::new(1.0, "%"))
}

pub fn volume_status(icons: &VolumeIcons, reading: VolumeReading) -> StatusValue {
    initial_volume_status(icons)
        .with_label(volume_icon(icons, reading))
        .with_value(reading.percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(muted: bool, percent: i64) -> VolumeReading {
        VolumeReading { muted, percent }
    }

    #[test]
    fn icon_thresholds() {
        let icons = VolumeIcons::default();
        assert_eq!(volume_icon(&icons, reading(false, 0)), icons.low);
        assert_eq!(volume_icon(&icons, reading(false, 15)), icons.low);
        assert_eq!(volume_icon(&icons, reading(false, 16)), icons.medium);
        assert_eq!(volume_icon(&icons, reading(false, 49)), icons.medium);
        assert_eq!(volume_icon(&icons, reading(false, 50)), icons.high);
        assert_eq!(volume_icon(&icons, reading(false, 150)), icons.high);
    }

    #[test]
    fn mute_wins_over_level() {
        let icons = VolumeIcons::default();
        assert_eq!(volume_icon(&icons, reading(true, 80)), icons.muted);
    }

    #[test]
    fn level_rounds_to_percent() {
        assert_eq!(VolumeReading::from_level(false, 0.66).percent, 66);
        assert_eq!(VolumeReading::from_level(false, 1.0).percent, 100);
    }

    #[test]
    fn status_text_is_padded_percent() {
        let icons = VolumeIcons::default();
        let s = volume_status(&icons, reading(false, 7));
        assert_eq!(s.tag, VOLUME_TAG);
        assert_eq!(s.text(), "  7%");
        assert_eq!(s.label, icons.low);
    }
}
