use crate::encoding::WordLength;

/// Nominal 4004 clock frequency in hertz.
pub const CLOCK_HZ: u64 = 740_000;
/// Clock periods in one machine (instruction) cycle.
pub const CLOCKS_PER_MACHINE_CYCLE: u64 = 8;

/// Instruction forms with fixed machine-cycle costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleCostKind {
    /// OPR + OPA only.
    OneWord,
    /// OPR + OPA followed by a second byte.
    TwoWord,
}

impl From<WordLength> for CycleCostKind {
    fn from(length: WordLength) -> Self {
        match length {
            WordLength::One => Self::OneWord,
            WordLength::Two => Self::TwoWord,
        }
    }
}

/// Single source-of-truth machine-cycle cost table.
pub const CYCLE_COST_TABLE: &[(CycleCostKind, u8)] =
    &[(CycleCostKind::OneWord, 1), (CycleCostKind::TwoWord, 2)];

/// Returns the machine-cycle cost for an instruction form.
#[must_use]
pub fn cycle_cost(kind: CycleCostKind) -> Option<u8> {
    CYCLE_COST_TABLE
        .iter()
        .find_map(|(entry, cost)| (*entry == kind).then_some(*cost))
}

/// Machine cycles consumed by an instruction of the given length.
#[must_use]
pub fn machine_cycles(length: WordLength) -> u8 {
    cycle_cost(length.into()).unwrap_or(1)
}

/// Wall-clock time the real part would take for `cycles` machine cycles, in nanoseconds.
///
/// Saturates at `u64::MAX`.
#[must_use]
pub fn elapsed_nanos(cycles: u64) -> u64 {
    let nanos = u128::from(cycles) * u128::from(CLOCKS_PER_MACHINE_CYCLE) * 1_000_000_000
        / u128::from(CLOCK_HZ);
    u64::try_from(nanos).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        cycle_cost, elapsed_nanos, machine_cycles, CycleCostKind, CYCLE_COST_TABLE,
    };
    use crate::encoding::WordLength;

    #[test]
    fn every_kind_has_a_single_entry() {
        for kind in [CycleCostKind::OneWord, CycleCostKind::TwoWord] {
            let entries = CYCLE_COST_TABLE
                .iter()
                .filter(|(entry, _)| *entry == kind)
                .count();
            assert_eq!(entries, 1, "{kind:?}");
        }
    }

    #[test]
    fn costs_follow_word_count() {
        assert_eq!(cycle_cost(CycleCostKind::OneWord), Some(1));
        assert_eq!(machine_cycles(WordLength::One), 1);
        assert_eq!(machine_cycles(WordLength::Two), 2);
    }

    #[test]
    fn machine_cycle_lasts_about_ten_point_eight_microseconds() {
        assert_eq!(elapsed_nanos(1), 10_810);
        assert_eq!(elapsed_nanos(12_500), 135_135_135);
        assert_eq!(elapsed_nanos(3_000_000_000), 32_432_432_432_432);
        assert_eq!(elapsed_nanos(u64::MAX), u64::MAX);
    }
}
