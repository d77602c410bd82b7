//! 时间推导状态计算：纯函数，无 I/O
//!
//! 账本上的状态是离散、昂贵地写入的，而真相随时间连续演化。本模块把
//! （植物快照 + 当前时刻 + 规则）映射为推导值：期望阶段、失同步判定、
//! 预测水位、进度与阈值。所有函数都显式接收 `now`，不偷读时钟。

use crate::config::GrowthRules;
use crate::plant::{GrowthStage, Plant, Vitality};

/// 按流逝时间计算期望阶段：min(floor(age / stage_duration), Blooming)
///
/// 死亡或不存在的植物直接返回记录阶段（期望阶段对它们无意义）。
pub fn expected_stage(plant: &Plant, now: i64, rules: &GrowthRules) -> GrowthStage {
    if plant.is_dead || !plant.exists {
        return plant.stage;
    }

    let elapsed = plant.age_secs(now);
    let index = (elapsed / rules.stage_duration_secs).min(GrowthStage::MAX_INDEX as i64);
    GrowthStage::from_index(index as u8)
}

/// 记录阶段是否落后于期望阶段（需要发一笔矫正交易）
///
/// 只做前向矫正：记录阶段反而超前属于时钟偏移或账本异常，记 debug 日志并
/// 返回 false，绝不触发写入。
pub fn is_stage_out_of_sync(plant: &Plant, now: i64, rules: &GrowthRules) -> bool {
    if plant.is_dead || !plant.exists {
        return false;
    }

    let expected = expected_stage(plant, now, rules);
    if plant.stage > expected {
        tracing::debug!(
            plant = plant.id,
            recorded = ?plant.stage,
            expected = ?expected,
            "Recorded stage ahead of expected, ignoring"
        );
        return false;
    }
    plant.stage < expected
}

/// 客户端预测水位（不访问账本）
///
/// Blooming 后水位不再消耗，直接返回检查点；其余存活阶段按
/// floor(距上次浇水 / 消耗间隔) × 消耗量 从检查点递减，下限 0。
pub fn predicted_water_level(plant: &Plant, now: i64, rules: &GrowthRules) -> u8 {
    if !plant.exists || plant.is_dead {
        return 0;
    }
    if plant.stage == GrowthStage::Blooming {
        return plant.water_level;
    }

    let intervals = plant.secs_since_watered(now) / rules.water_depletion_interval_secs;
    let lost = intervals.saturating_mul(rules.water_depletion_amount as i64);
    if lost >= plant.water_level as i64 {
        0
    } else {
        plant.water_level - lost as u8
    }
}

/// 存活状态的类型化判定（见 `Vitality`）
///
/// 预测水位为 0 只意味着客户端认为植物已枯竭，账本可能尚未记录死亡；
/// 调用方把它当不可操作处理，但不得当作账本事实。
pub fn vitality(plant: &Plant, now: i64, rules: &GrowthRules) -> Vitality {
    if plant.is_dead || !plant.exists {
        return Vitality::ConfirmedDead;
    }

    let level = predicted_water_level(plant, now, rules);
    if level == 0 {
        Vitality::PredictedExhausted
    } else {
        Vitality::Alive { water_level: level }
    }
}

/// 朝向 Blooming 的进度百分比（Blooming 恒为 100）
pub fn progress_percent(plant: &Plant, now: i64, rules: &GrowthRules) -> f64 {
    if !plant.exists {
        return 0.0;
    }
    if plant.stage == GrowthStage::Blooming {
        return 100.0;
    }

    let elapsed = plant.age_secs(now) as f64;
    let stage_start = plant.stage.index() as f64 * rules.stage_duration_secs as f64;
    let in_stage = (elapsed - stage_start) / rules.stage_duration_secs as f64 * 25.0;

    (plant.stage.index() as f64 * 25.0 + in_stage).clamp(0.0, 100.0)
}

/// 水位是否低于 50（需要照看）；死亡、预测枯竭与 Blooming 均为 false
pub fn needs_water(plant: &Plant, now: i64, rules: &GrowthRules) -> bool {
    below_threshold(plant, now, rules, 50)
}

/// 水位是否低于 20（危急）
pub fn is_critical(plant: &Plant, now: i64, rules: &GrowthRules) -> bool {
    below_threshold(plant, now, rules, 20)
}

fn below_threshold(plant: &Plant, now: i64, rules: &GrowthRules, threshold: u8) -> bool {
    if plant.stage == GrowthStage::Blooming {
        return false;
    }
    match vitality(plant, now, rules) {
        Vitality::Alive { water_level } => water_level < threshold,
        _ => false,
    }
}

/// 是否可收获：Blooming、存在、未死亡且未预测枯竭
pub fn can_harvest(plant: &Plant, now: i64, rules: &GrowthRules) -> bool {
    plant.stage == GrowthStage::Blooming && vitality(plant, now, rules).is_actionable()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> GrowthRules {
        GrowthRules {
            stage_duration_secs: 60,
            water_depletion_interval_secs: 30,
            water_depletion_amount: 10,
            seed_price_wei: 1_000_000_000_000_000,
            harvest_reward_multiplier: 3,
        }
    }

    fn plant_at(planted_at: i64) -> Plant {
        Plant {
            id: 1,
            owner: "0xabc".into(),
            stage: GrowthStage::Seed,
            planted_at,
            last_watered_at: planted_at,
            water_level: 100,
            exists: true,
            is_dead: false,
        }
    }

    #[test]
    fn expected_stage_thresholds() {
        // 种植后 59 秒仍是 Seed，第 60 秒进入 Sprout
        let p = plant_at(1_000);
        assert_eq!(expected_stage(&p, 1_059, &rules()), GrowthStage::Seed);
        assert_eq!(expected_stage(&p, 1_060, &rules()), GrowthStage::Sprout);
    }

    #[test]
    fn expected_stage_is_monotonic_and_bounded() {
        let p = plant_at(0);
        let r = rules();
        let mut prev = expected_stage(&p, 0, &r);
        for now in (0..600).step_by(7) {
            let cur = expected_stage(&p, now, &r);
            assert!(cur >= prev, "stage regressed at now={}", now);
            assert!(cur.index() <= GrowthStage::MAX_INDEX);
            prev = cur;
        }
        assert_eq!(expected_stage(&p, 1_000_000, &r), GrowthStage::Blooming);
    }

    #[test]
    fn expected_stage_before_planting_is_seed() {
        let p = plant_at(1_000);
        assert_eq!(expected_stage(&p, 500, &rules()), GrowthStage::Seed);
    }

    #[test]
    fn out_of_sync_only_when_recorded_lags() {
        let r = rules();
        let mut p = plant_at(0);

        // 130 秒后期望 Growing，记录 Seed → 失同步
        assert!(is_stage_out_of_sync(&p, 130, &r));

        // 记录等于期望 → 同步
        p.stage = GrowthStage::Growing;
        assert!(!is_stage_out_of_sync(&p, 130, &r));

        // 记录超前于期望 → 异常，绝不触发矫正
        p.stage = GrowthStage::Blooming;
        assert!(!is_stage_out_of_sync(&p, 130, &r));
    }

    #[test]
    fn dead_or_missing_plants_never_out_of_sync() {
        let r = rules();
        let mut p = plant_at(0);
        p.is_dead = true;
        assert!(!is_stage_out_of_sync(&p, 500, &r));

        let mut p = plant_at(0);
        p.exists = false;
        assert!(!is_stage_out_of_sync(&p, 500, &r));
    }

    #[test]
    fn water_depletion_schedule() {
        // 检查点 40，每 30 秒扣 10：+29s 仍 40，+30s 变 30，+150s 归零
        let r = rules();
        let mut p = plant_at(0);
        p.water_level = 40;
        assert_eq!(predicted_water_level(&p, 29, &r), 40);
        assert_eq!(predicted_water_level(&p, 30, &r), 30);
        assert_eq!(predicted_water_level(&p, 150, &r), 0);
    }

    #[test]
    fn water_decay_is_monotonic_and_floored() {
        let r = rules();
        let p = plant_at(0);
        let mut prev = predicted_water_level(&p, 0, &r);
        for now in (0..1_200).step_by(13) {
            let cur = predicted_water_level(&p, now, &r);
            assert!(cur <= prev, "water rose at now={}", now);
            prev = cur;
        }
        assert_eq!(predicted_water_level(&p, 100_000, &r), 0);
    }

    #[test]
    fn blooming_freezes_water() {
        let r = rules();
        let mut p = plant_at(0);
        p.stage = GrowthStage::Blooming;
        p.water_level = 70;
        assert_eq!(predicted_water_level(&p, 1_000_000, &r), 70);
    }

    #[test]
    fn vitality_variants() {
        let r = rules();
        let mut p = plant_at(0);
        assert_eq!(vitality(&p, 10, &r), Vitality::Alive { water_level: 100 });

        // 水耗尽但账本未记录死亡 → 预测枯竭，不是确认死亡
        assert_eq!(vitality(&p, 10_000, &r), Vitality::PredictedExhausted);
        assert!(!vitality(&p, 10_000, &r).is_actionable());

        p.is_dead = true;
        assert_eq!(vitality(&p, 10, &r), Vitality::ConfirmedDead);
    }

    #[test]
    fn progress_reaches_100_at_blooming() {
        let r = rules();
        let mut p = plant_at(0);
        assert_eq!(progress_percent(&p, 0, &r), 0.0);
        assert!((progress_percent(&p, 30, &r) - 12.5).abs() < 1e-9);

        p.stage = GrowthStage::Blooming;
        assert_eq!(progress_percent(&p, 30, &r), 100.0);

        p.stage = GrowthStage::Growing;
        // 记录阶段超前时进度不为负
        assert!(progress_percent(&p, 10, &r) >= 0.0);
    }

    #[test]
    fn thresholds_off_for_dead_exhausted_and_blooming() {
        let r = rules();
        let mut p = plant_at(0);
        p.water_level = 40;
        assert!(needs_water(&p, 0, &r));
        assert!(!is_critical(&p, 0, &r));

        // 降到 20 以下 → 危急
        assert!(is_critical(&p, 90, &r));

        // 归零 → 预测枯竭，两个阈值都关掉
        assert!(!needs_water(&p, 10_000, &r));
        assert!(!is_critical(&p, 10_000, &r));

        p.stage = GrowthStage::Blooming;
        p.water_level = 10;
        assert!(!needs_water(&p, 0, &r));
        assert!(!is_critical(&p, 0, &r));
    }

    #[test]
    fn harvest_requires_actionable_blooming() {
        let r = rules();
        let mut p = plant_at(0);
        assert!(!can_harvest(&p, 10, &r));

        p.stage = GrowthStage::Blooming;
        assert!(can_harvest(&p, 10, &r));

        p.is_dead = true;
        assert!(!can_harvest(&p, 10, &r));
    }
}
