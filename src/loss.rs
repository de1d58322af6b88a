//! negative log partial likelihood - the DeepSurv ranking loss.
//!
//! the whole dataset is one batch and must already be sorted by descending
//! survival time: then the risk set of patient i (everyone who survived at
//! least as long) is exactly the prefix `0..=i`, and the log cumulative
//! hazard falls out of a running sum.

use ndarray::{Array1, ArrayView1};

use crate::error::{DeepSurvError, Result};

/// average negative log partial likelihood over the observed events.
///
/// for each patient: hazard ratio = exp(score), log cumulative hazard = log
/// of the running sum of hazard ratios in sorted order, contribution =
/// score - log cumulative hazard, masked by the event indicator. the masked
/// contributions are summed, negated, and divided by the number of observed
/// events.
pub fn neg_log_partial_likelihood(
    risk_scores: ArrayView1<f64>,
    events: &[bool],
) -> Result<f64> {
    check_inputs(risk_scores, events)?;

    let n_events = events.iter().filter(|&&e| e).count();
    if n_events == 0 {
        return Err(DeepSurvError::invalid_survival_data(
            "no observed events - partial likelihood is undefined",
        ));
    }

    // running log-sum-exp over the prefix of hazard ratios
    let mut running_max = f64::NEG_INFINITY;
    let mut running_sum = 0.0;
    let mut neg_likelihood = 0.0;

    for (i, &score) in risk_scores.iter().enumerate() {
        if score > running_max {
            running_sum *= (running_max - score).exp();
            running_max = score;
        }
        running_sum += (score - running_max).exp();

        if events[i] {
            let log_cum_hazard = running_max + running_sum.ln();
            neg_likelihood -= score - log_cum_hazard;
        }
    }

    Ok(neg_likelihood / n_events as f64)
}

/// gradient of [`neg_log_partial_likelihood`] w.r.t. the risk scores.
///
/// d loss / d score_k = -(1/d) * (e_k - exp(score_k) * sum over events i >= k
/// of 1 / cum_hazard_i), where d is the number of observed events. the
/// cumulative sums are shifted by the max score before exponentiation.
pub fn neg_log_partial_likelihood_grad(
    risk_scores: ArrayView1<f64>,
    events: &[bool],
) -> Result<Array1<f64>> {
    check_inputs(risk_scores, events)?;

    let n = risk_scores.len();
    let n_events = events.iter().filter(|&&e| e).count();
    if n_events == 0 {
        return Err(DeepSurvError::invalid_survival_data(
            "no observed events - partial likelihood is undefined",
        ));
    }

    let max_score = risk_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let shifted: Vec<f64> = risk_scores.iter().map(|&s| (s - max_score).exp()).collect();

    // prefix sums of shifted hazard ratios = shifted cumulative hazards
    let mut cum = Vec::with_capacity(n);
    let mut acc = 0.0;
    for &h in &shifted {
        acc += h;
        cum.push(acc);
    }

    // suffix sums of 1/cum over the event positions
    let mut inv_cum_suffix = vec![0.0; n];
    let mut tail = 0.0;
    for i in (0..n).rev() {
        if events[i] {
            tail += 1.0 / cum[i];
        }
        inv_cum_suffix[i] = tail;
    }

    let scale = 1.0 / n_events as f64;
    let grad = (0..n)
        .map(|k| {
            let event_term = if events[k] { 1.0 } else { 0.0 };
            -scale * (event_term - shifted[k] * inv_cum_suffix[k])
        })
        .collect();

    Ok(grad)
}

fn check_inputs(risk_scores: ArrayView1<f64>, events: &[bool]) -> Result<()> {
    if risk_scores.len() != events.len() {
        return Err(DeepSurvError::invalid_dimensions(format!(
            "risk scores len ({}) != events len ({})",
            risk_scores.len(),
            events.len()
        )));
    }
    if risk_scores.is_empty() {
        return Err(DeepSurvError::invalid_dimensions(
            "need at least 1 sample for the partial likelihood",
        ));
    }
    Ok(())
}
