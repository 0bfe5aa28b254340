use super::{InterferenceKind, InterferenceReport};
use crate::platform::PlatformInfo;

/// Cutoff for [`is_optimal_environment`].
pub const OPTIMAL_ENVIRONMENT_SCORE: f64 = 75.0;

fn flag_penalty(kind: InterferenceKind) -> f64 {
    match kind {
        InterferenceKind::BackgroundCpu => 10.0,
        InterferenceKind::MemoryPressure => 8.0,
        InterferenceKind::IoWait => 12.0,
        InterferenceKind::ThermalThrottling => 15.0,
        InterferenceKind::NetworkCongestion => 0.0,
    }
}

/// Suitability of the machine for benchmarking right now, in [0, 100].
///
/// Base 50, plus 40% of the platform score, plus 30 for a quiet system (or
/// itemized penalties), plus 10 for each of turbo, a non-powersave governor
/// and bare metal.
pub fn environment_score(platform: &PlatformInfo, interference: &InterferenceReport) -> f64 {
    let mut score = 50.0 + platform.performance_score() * 0.4;

    if interference.has_interference() {
        for kind in interference.active() {
            score -= flag_penalty(kind);
        }
    } else {
        score += 30.0;
    }

    if platform.turbo_boost_enabled {
        score += 10.0;
    }
    if !platform.is_power_saving() {
        score += 10.0;
    }
    if !platform.is_virtualized {
        score += 10.0;
    }
    score.clamp(0.0, 100.0)
}

pub fn is_optimal_environment(score: f64) -> bool {
    score >= OPTIMAL_ENVIRONMENT_SCORE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_tuned_machine_is_optimal() {
        let platform = PlatformInfo {
            turbo_boost_enabled: true,
            cpu_governor: "performance".into(),
            ..Default::default()
        };
        let score = environment_score(&platform, &InterferenceReport::default());
        assert_eq!(score, 100.0);
        assert!(is_optimal_environment(score));
    }

    #[test]
    fn test_interference_and_config_penalties() {
        let platform = PlatformInfo {
            cpu_governor: "powersave".into(),
            is_virtualized: true,
            ..Default::default()
        };
        let mut report = InterferenceReport::default();
        report.set(InterferenceKind::ThermalThrottling);
        report.set(InterferenceKind::IoWait);

        // 50 * 0.8 * 0.9 * 0.7 = 25.2 platform score
        let expected = 50.0 + 25.2 * 0.4 - 15.0 - 12.0;
        let score = environment_score(&platform, &report);
        assert!((score - expected).abs() < 1e-9);
        assert!(!is_optimal_environment(score));
    }
}
