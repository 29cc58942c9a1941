//! Formatted terminal output.
//!
//! Formatting lives here so the session state machine only decides *what* to show.

use crate::domain::{FitOutcome, LineList};
use crate::fit::{Interpolation, ResolutionFit};

/// Line list as an indexed table, five entries per row: `( j): wavelength`.
pub fn format_line_table(list: &LineList) -> String {
    let mut out = String::new();
    let n = list.len();
    for (j, line) in list.values().iter().enumerate().map(|(i, v)| (i + 1, v)) {
        out.push_str(&format!("({j:2}): {line:8.2}"));
        if j % 5 == 0 || j == n {
            out.push('\n');
        } else {
            out.push_str(", ");
        }
    }
    out
}

/// Per-line outcomes plus the fitted polynomial.
pub fn format_fit_summary(run: &ResolutionFit) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Line fits (dX = {:.3}): {} of {} succeeded\n",
        run.half_width,
        run.points.len(),
        run.outcomes.len()
    ));
    out.push_str("   #  wavelength        FWHM       error\n");
    for (i, o) in run.outcomes.iter().enumerate() {
        match &o.outcome {
            FitOutcome::Success(fit) => out.push_str(&format!(
                "{:>4}  {:>10.3}  {:>10.4}  {:>10.4}\n",
                i + 1,
                o.wavelength,
                fit.fwhm,
                fit.fwhm_err
            )),
            FitOutcome::Failure(reason) => out.push_str(&format!(
                "{:>4}  {:>10.3}  failed: {reason}\n",
                i + 1,
                o.wavelength
            )),
        }
    }

    out.push_str(&format!(
        "\nResolution model: degree {} (u = (λ - {:.3}) / {:.3})\n",
        run.model.degree, run.model.centre, run.model.scale
    ));
    out.push_str(&format!("- coefficients: {}\n", fmt_vec(&run.model.coefficients)));
    out.push_str(&format!("- weighted rms: {:.4}\n", run.weighted_rms));
    out
}

pub fn format_interpolation(interp: &Interpolation) -> String {
    format!(
        "λ = {:.3}: FWHM = {:.4}, R = {:.1}",
        interp.wavelength, interp.resolution, interp.resolving_power
    )
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6e}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineFit, LineFitFailure, LineOutcome, ResolutionModel};
    use crate::fit::FitPoint;

    #[test]
    fn line_table_wraps_every_five() {
        let list = LineList::from_values((1..=7).map(|i| 5000.0 + i as f64));
        let table = format_line_table(&list);
        let rows: Vec<&str> = table.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("( 1):  5001.00, ( 2):"));
        assert!(rows[1].ends_with("( 7):  5007.00"));
    }

    #[test]
    fn fit_summary_lists_every_outcome() {
        let run = ResolutionFit {
            half_width: 5.0,
            outcomes: vec![
                LineOutcome {
                    wavelength: 5500.0,
                    outcome: FitOutcome::Success(LineFit {
                        center: 5500.0,
                        fwhm: 2.1,
                        fwhm_err: 0.1,
                        profile: Vec::new(),
                    }),
                },
                LineOutcome {
                    wavelength: 7800.0,
                    outcome: FitOutcome::Failure(LineFitFailure::NoConvergence),
                },
            ],
            points: vec![FitPoint {
                wavelength: 5500.0,
                fwhm: 2.1,
                fwhm_err: 0.1,
            }],
            model: ResolutionModel {
                degree: 0,
                centre: 5500.0,
                scale: 1.0,
                coefficients: vec![2.1],
            },
            weighted_rms: 0.0,
        };
        let text = format_fit_summary(&run);
        assert!(text.contains("1 of 2 succeeded"));
        assert!(text.contains("failed: no convergence"));
        assert!(text.contains("degree 0"));
    }
}
