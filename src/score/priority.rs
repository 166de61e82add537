// src/score/priority.rs
//! Rank-based boost for topics the user ordered first.

/// Linear boost from `max_boost` at rank 0 down to zero at the last
/// ranked position, rounded to two decimals. Unranked topics and a
/// non-positive maximum yield zero.
pub fn priority_boost(topic: &str, order: &[String], max_boost: f64) -> f64 {
    if max_boost <= 0.0 {
        return 0.0;
    }
    let Some(rank) = order.iter().position(|t| t == topic) else {
        return 0.0;
    };
    let boost = if order.len() <= 1 {
        max_boost
    } else {
        max_boost * (order.len() - 1 - rank) as f64 / (order.len() - 1) as f64
    };
    (boost * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Vec<String> {
        vec!["ai".into(), "climate".into(), "markets".into()]
    }

    #[test]
    fn first_rank_gets_max() {
        assert_eq!(priority_boost("ai", &order(), 3.0), 3.0);
    }

    #[test]
    fn last_rank_gets_zero() {
        assert_eq!(priority_boost("markets", &order(), 3.0), 0.0);
    }

    #[test]
    fn middle_rank_interpolates_and_rounds() {
        assert_eq!(priority_boost("climate", &order(), 3.0), 1.5);
        assert_eq!(priority_boost("climate", &order(), 1.0), 0.5);
    }

    #[test]
    fn unranked_or_disabled_yield_zero() {
        assert_eq!(priority_boost("sports", &order(), 3.0), 0.0);
        assert_eq!(priority_boost("ai", &order(), 0.0), 0.0);
        assert_eq!(priority_boost("ai", &order(), -2.0), 0.0);
    }

    #[test]
    fn single_entry_order_gets_max() {
        assert_eq!(priority_boost("ai", &["ai".to_string()], 2.5), 2.5);
    }
}
