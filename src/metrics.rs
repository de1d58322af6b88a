//! ranking accuracy for survival predictions.
//!
//! a pair of patients is usable for scoring when one of them had an
//! observed event and the other is known to have outlived that event time.
//! censored patients never anchor a pair - their event time is unknown -
//! but they still count as survivors against earlier events.

use ndarray::ArrayView1;

use crate::error::{DeepSurvError, Result};

/// can patient `j` be scored against event patient `i`?
/// yes when j outlived i's event, either outright or by being censored
/// no earlier than it.
fn outlived(times: ArrayView1<f64>, events: &[bool], i: usize, j: usize) -> bool {
    times[j] > times[i] || (!events[j] && times[j] >= times[i])
}

fn check_lengths(risk_scores: ArrayView1<f64>, times: ArrayView1<f64>, events: &[bool]) -> Result<()> {
    if risk_scores.len() != times.len() || times.len() != events.len() {
        return Err(DeepSurvError::invalid_dimensions(format!(
            "scores/times/events lengths differ: {} / {} / {}",
            risk_scores.len(),
            times.len(),
            events.len()
        )));
    }
    Ok(())
}

/// fraction of usable pairs where the shorter-lived patient got the higher
/// risk score. tied scores count as concordant here; [`harrell_c_index`]
/// gives ties half credit instead.
pub fn concordance_index(
    risk_scores: ArrayView1<f64>,
    times: ArrayView1<f64>,
    events: &[bool],
) -> Result<f64> {
    check_lengths(risk_scores, times, events)?;

    let n = risk_scores.len();
    if n < 2 {
        return Err(DeepSurvError::invalid_dimensions(
            "concordance needs at least 2 patients",
        ));
    }

    let mut concordant = 0u64;
    let mut comparable = 0u64;

    for i in 0..n {
        if !events[i] {
            continue;
        }
        for j in 0..n {
            if i == j || !outlived(times, events, i, j) {
                continue;
            }
            comparable += 1;
            if risk_scores[i] >= risk_scores[j] {
                concordant += 1;
            }
        }
    }

    if comparable == 0 {
        return Err(DeepSurvError::numerical_error(
            "every patient is censored or tied - no pair is scoreable",
        ));
    }

    Ok(concordant as f64 / comparable as f64)
}

/// Harrell's C-index: concordant pairs plus half credit for risk-score
/// ties, over all usable pairs
pub fn harrell_c_index(
    risk_scores: ArrayView1<f64>,
    times: ArrayView1<f64>,
    events: &[bool],
) -> Result<f64> {
    check_lengths(risk_scores, times, events)?;

    let n = risk_scores.len();
    let mut concordant = 0.0;
    let mut tied_risk = 0.0;
    let mut total_pairs = 0.0;

    for i in 0..n {
        if !events[i] {
            continue;
        }
        for j in 0..n {
            if i == j || !outlived(times, events, i, j) {
                continue;
            }
            total_pairs += 1.0;
            if risk_scores[i] > risk_scores[j] {
                concordant += 1.0;
            } else if risk_scores[i] == risk_scores[j] {
                tied_risk += 1.0;
            }
        }
    }

    if total_pairs == 0.0 {
        return Err(DeepSurvError::numerical_error(
            "every patient is censored or tied - no pair is scoreable",
        ));
    }

    Ok((concordant + 0.5 * tied_risk) / total_pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;

    #[test]
    fn test_concordance_index_bounds() {
        let times = Array1::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let events = [true, false, true, true, false];
        let risk_scores = Array1::from(vec![0.5, -0.2, 0.8, -0.1, -0.5]);

        let c_index = concordance_index(risk_scores.view(), times.view(), &events).unwrap();
        assert!((0.0..=1.0).contains(&c_index));
    }

    #[test]
    fn test_perfect_concordance() {
        let times = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let events = [true, true, true, true];
        let risk_scores = Array1::from(vec![4.0, 3.0, 2.0, 1.0]); // perfectly anti-correlated with time

        let c_index = concordance_index(risk_scores.view(), times.view(), &events).unwrap();
        assert_relative_eq!(c_index, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_perfect_discordance() {
        let times = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let events = [true, true, true, true];
        let risk_scores = Array1::from(vec![1.0, 2.0, 3.0, 4.0]); // backwards

        let harrell = harrell_c_index(risk_scores.view(), times.view(), &events).unwrap();
        assert_relative_eq!(harrell, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_harrell_ties_get_half_credit() {
        let times = Array1::from(vec![1.0, 2.0, 3.0]);
        let events = [true, true, true];
        let risk_scores = Array1::from(vec![1.0, 1.0, 1.0]); // all tied

        let harrell = harrell_c_index(risk_scores.view(), times.view(), &events).unwrap();
        assert_relative_eq!(harrell, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_censored_anchors_are_skipped() {
        // only patient 0 is an event anchor; patients 1 and 2 both outlived it
        let times = Array1::from(vec![1.0, 2.0, 3.0]);
        let events = [true, false, false];
        let risk_scores = Array1::from(vec![2.0, 1.0, 3.0]);

        let harrell = harrell_c_index(risk_scores.view(), times.view(), &events).unwrap();
        // one concordant pair (vs patient 1), one discordant (vs patient 2)
        assert_relative_eq!(harrell, 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_censored_at_event_time_counts_as_survivor() {
        // patient 1 censored exactly at patient 0's event time: scoreable
        let times = Array1::from(vec![2.0, 2.0]);
        let events = [true, false];
        let risk_scores = Array1::from(vec![1.0, 0.0]);

        let c_index = concordance_index(risk_scores.view(), times.view(), &events).unwrap();
        assert_relative_eq!(c_index, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_dimension_mismatch_error() {
        let risk_scores = Array1::from(vec![1.0, 2.0]);
        let times = Array1::from(vec![1.0, 2.0, 3.0]);
        let events = [true, false];

        assert!(concordance_index(risk_scores.view(), times.view(), &events).is_err());
    }

    #[test]
    fn test_no_comparable_pairs_error() {
        // everyone censored: no anchors at all
        let times = Array1::from(vec![1.0, 2.0]);
        let events = [false, false];
        let risk_scores = Array1::from(vec![0.3, 0.7]);

        assert!(concordance_index(risk_scores.view(), times.view(), &events).is_err());
        assert!(harrell_c_index(risk_scores.view(), times.view(), &events).is_err());
    }
}
