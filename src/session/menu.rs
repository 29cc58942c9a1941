//! The interactive menu as an explicit state machine.
//!
//! [`step`] handles one state: it reads at most one console line, applies the
//! command to the [`Session`], and returns the next state. [`run_session`] drives
//! `step` until the user quits or input ends.

use std::path::Path;

use crate::domain::{CLEAR_CONFIRM_TOKEN, ClearRequest, has_lines};
use crate::error::{AppError, CalibError};
use crate::fit::LineFitter;
use crate::plot::{Plotter, PointPicker, profiles_figure, resolution_figure};
use crate::report::{format_fit_summary, format_interpolation, format_line_table};
use crate::session::{Console, PROMPT, Session};

const TOP_MENU: &str = "options:\n\
1) load sky spectrum\n\
2) ID lines\n\
3) fit lines\n\
4) read lines\n\
5) write lines\n\
6) edit lines\n\
7) quit";

const LOAD_MENU: &str = "load spectrum:\n\
1) load sky spectrum\n\
2) exit";

const FIT_MENU: &str = "fit lines:\n\
1) run fit\n\
2) plot fit\n\
3) interpolate resolution\n\
4) set dX\n\
5) set degree\n\
6) export model\n\
7) exit";

const EDIT_MENU: &str = "edit lines:\n\
1) remove line\n\
2) clear all lines\n\
3) exit";

#[derive(Debug)]
pub enum MenuState {
    Top,
    LoadSpectrum,
    LoadSpectrumPath,
    IdentifyLines,
    FitWorkflow,
    Interpolate,
    SetHalfWidth,
    SetDegree,
    ExportModel,
    ReadLines,
    WriteLines,
    EditLines,
    RemoveLine,
    ConfirmClear(ClearRequest),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user confirmed quitting.
    Quit,
    /// Console input ended.
    Interrupted,
}

#[derive(Debug)]
pub enum Transition {
    Next(MenuState),
    End(SessionEnd),
}

/// Capabilities the menu hands work to.
pub struct Collaborators<'a, P> {
    pub fitter: &'a dyn LineFitter,
    pub plotter: &'a mut P,
}

/// Run the menu from the top until the session ends.
pub fn run_session<P: Plotter + PointPicker>(
    session: &mut Session,
    console: &mut dyn Console,
    tools: &mut Collaborators<'_, P>,
) -> Result<SessionEnd, AppError> {
    let mut state = MenuState::Top;
    loop {
        match step(state, session, console, tools)? {
            Transition::Next(next) => {
                tracing::trace!(state = ?next, "menu transition");
                state = next;
            }
            Transition::End(end) => {
                tracing::debug!(?end, "session ended");
                return Ok(end);
            }
        }
    }
}

/// Read one line; `None` means input ended.
macro_rules! read_or_end {
    ($console:expr, $text:expr) => {
        match ask($console, $text)? {
            Some(input) => input,
            None => return Ok(Transition::End(SessionEnd::Interrupted)),
        }
    };
}

/// Handle `state` once.
pub fn step<P: Plotter + PointPicker>(
    state: MenuState,
    session: &mut Session,
    console: &mut dyn Console,
    tools: &mut Collaborators<'_, P>,
) -> Result<Transition, AppError> {
    use MenuState as S;

    let next = match state {
        S::Top => {
            let header = format!("FIT-SKYLINES\n{}\n{TOP_MENU}", status_line(session));
            let input = read_or_end!(console, &header);
            match command(&input).as_str() {
                "" => S::Top,
                "1" | "load" => S::LoadSpectrum,
                "2" | "identify" => S::IdentifyLines,
                "3" | "fit" => S::FitWorkflow,
                "4" | "read" => S::ReadLines,
                "5" | "write" => S::WriteLines,
                "6" | "edit" => S::EditLines,
                "7" | "quit" => S::Quit,
                _ => {
                    not_understood(console, &input)?;
                    S::Top
                }
            }
        }

        S::LoadSpectrum => {
            let input = read_or_end!(console, LOAD_MENU);
            match command(&input).as_str() {
                "" => S::LoadSpectrum,
                "1" | "load" => S::LoadSpectrumPath,
                "2" | "exit" => S::Top,
                _ => {
                    not_understood(console, &input)?;
                    S::LoadSpectrum
                }
            }
        }

        S::LoadSpectrumPath => {
            let input = read_or_end!(console, "filename:");
            let path = input.trim();
            if path.is_empty() {
                S::LoadSpectrum
            } else {
                match session.load_spectrum(Path::new(path)) {
                    Ok(spectrum) => {
                        let (lo, hi) = spectrum.domain();
                        let msg = format!("Loaded {} samples ({lo:.3} - {hi:.3})", spectrum.len());
                        console.print(&msg)?;
                        S::Top
                    }
                    Err(e) => {
                        report(console, &e)?;
                        S::LoadSpectrum
                    }
                }
            }
        }

        S::IdentifyLines => {
            identify_lines(session, console, &mut *tools.plotter)?;
            S::Top
        }

        S::FitWorkflow => {
            if let Err(e) = session.ensure_fit_inputs() {
                report(console, &e)?;
                return Ok(Transition::Next(S::Top));
            }
            let header = format!("{FIT_MENU}\n{}", status_line(session));
            let input = read_or_end!(console, &header);
            match command(&input).as_str() {
                "" => S::FitWorkflow,
                "1" | "run-fit" => {
                    let text = match session.run_fit(tools.fitter) {
                        Ok(run) => format_fit_summary(run),
                        Err(e) => error_text(&e),
                    };
                    console.print(&text)?;
                    S::FitWorkflow
                }
                "2" | "plot-fit" => {
                    plot_fit(session, console, &mut *tools.plotter)?;
                    S::FitWorkflow
                }
                "3" | "interpolate" => S::Interpolate,
                "4" | "set-dx" => S::SetHalfWidth,
                "5" | "set-degree" => S::SetDegree,
                "6" | "export-model" => {
                    if session.last_fit().is_some() {
                        S::ExportModel
                    } else {
                        report(console, &CalibError::NoModel)?;
                        S::FitWorkflow
                    }
                }
                "7" | "exit" => S::Top,
                _ => {
                    not_understood(console, &input)?;
                    S::FitWorkflow
                }
            }
        }

        S::Interpolate => {
            let input = read_or_end!(console, "wavelength (empty to cancel):");
            let input = input.trim();
            if !input.is_empty() {
                match input.parse::<f64>() {
                    Ok(wavelength) => match session.interpolate(wavelength) {
                        Ok(interp) => console.print(&format_interpolation(&interp))?,
                        Err(e) => report(console, &e)?,
                    },
                    Err(_) => not_parsed(console, input)?,
                }
            }
            S::FitWorkflow
        }

        S::SetHalfWidth => {
            let text = format!(
                "dX (current {}; 0 < dX <= 100; empty to cancel):",
                session.config().half_width
            );
            let input = read_or_end!(console, &text);
            let input = input.trim();
            if input.is_empty() {
                S::FitWorkflow
            } else {
                match input.parse::<f64>() {
                    Ok(dx) => match session.set_half_width(dx) {
                        Ok(()) => {
                            console.print(&format!("dX set to {dx}"))?;
                            S::FitWorkflow
                        }
                        Err(e) => {
                            report(console, &e)?;
                            S::SetHalfWidth
                        }
                    },
                    Err(_) => {
                        not_parsed(console, input)?;
                        S::SetHalfWidth
                    }
                }
            }
        }

        S::SetDegree => {
            let text = format!(
                "polynomial degree (current {}; 0-6; empty to cancel):",
                session.config().degree
            );
            let input = read_or_end!(console, &text);
            let input = input.trim();
            if input.is_empty() {
                S::FitWorkflow
            } else {
                match input.parse::<i64>() {
                    Ok(degree) => match session.set_degree(degree) {
                        Ok(()) => {
                            console.print(&format!("degree set to {degree}"))?;
                            S::FitWorkflow
                        }
                        Err(e) => {
                            report(console, &e)?;
                            S::SetDegree
                        }
                    },
                    Err(_) => {
                        not_parsed(console, input)?;
                        S::SetDegree
                    }
                }
            }
        }

        S::ExportModel => {
            let input = read_or_end!(console, "output file (empty to cancel):");
            let path = input.trim();
            if !path.is_empty() {
                match session.export_model(Path::new(path)) {
                    Ok(()) => console.print(&format!("model written to {path}"))?,
                    Err(e) => report(console, &e)?,
                }
            }
            S::FitWorkflow
        }

        S::ReadLines => {
            let path = session.config().lines_file.display().to_string();
            match session.read_lines() {
                Ok(n) => console.print(&format!("{n} lines read from {path}"))?,
                Err(e) => report(console, &e)?,
            }
            S::Top
        }

        S::WriteLines => {
            let path = session.config().lines_file.display().to_string();
            match session.write_lines() {
                Ok(n) => console.print(&format!("{n} lines written to {path}"))?,
                Err(e) => report(console, &e)?,
            }
            S::Top
        }

        S::EditLines => {
            if !has_lines(session.lines()) {
                report(console, &CalibError::NoLineList)?;
                return Ok(Transition::Next(S::Top));
            }
            let input = read_or_end!(console, EDIT_MENU);
            match command(&input).as_str() {
                "" => S::EditLines,
                "1" | "remove" => S::RemoveLine,
                "2" | "clear" => match session.request_clear() {
                    Ok(request) => S::ConfirmClear(request),
                    Err(e) => {
                        report(console, &e)?;
                        S::Top
                    }
                },
                "3" | "exit" => S::Top,
                _ => {
                    not_understood(console, &input)?;
                    S::EditLines
                }
            }
        }

        S::RemoveLine => {
            let Some(table) = session.lines().filter(|l| !l.is_empty()).map(format_line_table) else {
                return Ok(Transition::Next(S::EditLines));
            };
            let text = format!("{table}Line index to remove (0 to return):");
            let input = read_or_end!(console, &text);
            let input = input.trim();
            match input.parse::<usize>() {
                Ok(0) => S::EditLines,
                Ok(index) => {
                    match session.remove_line(index) {
                        Ok(line) => console.print(&format!("Removed {line:.3} from position {index}"))?,
                        Err(e) => report(console, &e)?,
                    }
                    S::RemoveLine
                }
                Err(_) if input.is_empty() => S::RemoveLine,
                Err(_) => {
                    not_parsed(console, input)?;
                    S::RemoveLine
                }
            }
        }

        S::ConfirmClear(request) => {
            let input = read_or_end!(console, &format!("{CLEAR_CONFIRM_TOKEN} to confirm:"));
            if session.confirm_clear(request, input.trim()) {
                console.print("All lines cleared")?;
                S::Top
            } else {
                console.print("Clear cancelled")?;
                S::EditLines
            }
        }

        S::Quit => {
            let input = read_or_end!(console, "Quit (y/n):");
            if matches!(input.trim(), "y" | "Y") {
                return Ok(Transition::End(SessionEnd::Quit));
            }
            S::Top
        }
    };

    Ok(Transition::Next(next))
}

fn identify_lines<P: PointPicker>(
    session: &mut Session,
    console: &mut dyn Console,
    picker: &mut P,
) -> Result<(), AppError> {
    let Some(spectrum) = session.spectrum() else {
        return report(console, &CalibError::NoSpectrum);
    };
    let existing: Vec<f64> = session.lines().map(|l| l.values().to_vec()).unwrap_or_default();
    for x in &existing {
        console.print(&format!("{x:9.3}"))?;
    }
    console.print("Press 'w' to store line locations")?;

    match picker.pick_points(spectrum, &existing) {
        Ok(picked) => {
            let added = session.add_lines(&picked);
            let total = session.lines().map_or(0, |l| l.len());
            console.print(&format!("{added} line(s) added, {total} in list"))
        }
        Err(e) => console.print(&format!("error: {e}")),
    }
}

fn plot_fit<P: Plotter>(session: &Session, console: &mut dyn Console, plotter: &mut P) -> Result<(), AppError> {
    let (Some(spectrum), Some(run)) = (session.spectrum(), session.last_fit()) else {
        return report(console, &CalibError::NoModel);
    };
    let shown = plotter
        .render(&profiles_figure(spectrum, run))
        .and_then(|()| plotter.render(&resolution_figure(spectrum, run)));
    if let Err(e) = shown {
        console.print(&format!("error: {e}"))?;
    }
    Ok(())
}

fn ask(console: &mut dyn Console, text: &str) -> Result<Option<String>, AppError> {
    console.print(text)?;
    console.read_line(PROMPT)
}

/// Normalised menu command: trimmed and lowercase.
fn command(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

fn status_line(session: &Session) -> String {
    let spectrum = match session.spectrum() {
        Some(s) => {
            let name = s.source().map_or_else(|| "<memory>".to_string(), |p| p.display().to_string());
            format!("{name} ({} samples)", s.len())
        }
        None => "none".to_string(),
    };
    let lines = session.lines().map_or(0, |l| l.len());
    let model = if session.last_fit().is_some() { "fitted" } else { "none" };
    let cfg = session.config();
    format!(
        "[spectrum: {spectrum} | lines: {lines} | dX: {} | degree: {} | model: {model}]",
        cfg.half_width, cfg.degree
    )
}

fn error_text(err: &CalibError) -> String {
    format!("error: {err}")
}

fn report(console: &mut dyn Console, err: &CalibError) -> Result<(), AppError> {
    tracing::debug!(error = %err, "reported to user");
    console.print(&error_text(err))
}

fn not_understood(console: &mut dyn Console, input: &str) -> Result<(), AppError> {
    console.print(&format!("Cannot understand option '{}'", input.trim()))
}

fn not_parsed(console: &mut dyn Console, input: &str) -> Result<(), AppError> {
    console.print(&format!("Could not parse input '{input}'"))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::domain::{FitOutcome, HalfWidth, LineFit, LineList, SessionConfig, Spectrum};
    use crate::plot::Figure;

    #[derive(Default)]
    struct ScriptedConsole {
        input: VecDeque<String>,
        output: Vec<String>,
    }

    impl ScriptedConsole {
        fn new(lines: &[&str]) -> Self {
            Self {
                input: lines.iter().map(|s| s.to_string()).collect(),
                output: Vec::new(),
            }
        }

        fn saw(&self, needle: &str) -> bool {
            self.output.iter().any(|o| o.contains(needle))
        }
    }

    impl Console for ScriptedConsole {
        fn read_line(&mut self, _prompt: &str) -> Result<Option<String>, AppError> {
            Ok(self.input.pop_front())
        }

        fn print(&mut self, text: &str) -> Result<(), AppError> {
            self.output.push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubPlotter {
        picks: Vec<f64>,
        titles: Vec<String>,
    }

    impl Plotter for StubPlotter {
        fn render(&mut self, figure: &Figure) -> Result<(), AppError> {
            self.titles.push(figure.title.clone());
            Ok(())
        }
    }

    impl PointPicker for StubPlotter {
        fn pick_points(&mut self, _: &Spectrum, _: &[f64]) -> Result<Vec<f64>, AppError> {
            self.titles.push("pick".to_string());
            Ok(std::mem::take(&mut self.picks))
        }
    }

    fn width_fitter(_: &Spectrum, centre: f64, _: f64) -> FitOutcome {
        FitOutcome::Success(LineFit {
            center: centre,
            fwhm: 2.0,
            fwhm_err: 0.1,
            profile: Vec::new(),
        })
    }

    fn sky() -> Spectrum {
        let x: Vec<f64> = (0..=400).map(|i| 5000.0 + 10.0 * i as f64).collect();
        let n = x.len();
        Spectrum::new(x, vec![1.0; n], vec![0.1; n]).unwrap()
    }

    fn ready_session(lines: &[f64]) -> Session {
        let mut session = Session::new(SessionConfig::default());
        session.set_spectrum(sky());
        session.set_lines(Some(LineList::from_values(lines.iter().copied())));
        session
    }

    fn drive(session: &mut Session, script: &[&str], plotter: &mut StubPlotter) -> (SessionEnd, ScriptedConsole) {
        let mut console = ScriptedConsole::new(script);
        let mut tools = Collaborators {
            fitter: &width_fitter,
            plotter,
        };
        let end = run_session(session, &mut console, &mut tools).unwrap();
        (end, console)
    }

    #[test]
    fn top_menu_accepts_numbers_and_words() {
        let mut session = Session::new(SessionConfig::default());
        let mut plotter = StubPlotter::default();
        let (end, console) = drive(&mut session, &["", "bogus", "7", "n", "QUIT", "y"], &mut plotter);
        assert_eq!(end, SessionEnd::Quit);
        assert!(console.saw("Cannot understand option 'bogus'"));
        assert_eq!(console.output.iter().filter(|o| o.contains("Quit (y/n)")).count(), 2);
    }

    #[test]
    fn end_of_input_interrupts() {
        let mut session = Session::new(SessionConfig::default());
        let mut plotter = StubPlotter::default();
        let (end, _) = drive(&mut session, &["3", "1"], &mut plotter);
        assert_eq!(end, SessionEnd::Interrupted);
    }

    #[test]
    fn guarded_submenus_return_to_top() {
        let mut session = Session::new(SessionConfig::default());
        let mut plotter = StubPlotter::default();
        let (end, console) = drive(&mut session, &["1", "2", "2", "3", "6", "5", "7", "y"], &mut plotter);
        assert_eq!(end, SessionEnd::Quit);
        assert!(console.saw("error: no spectrum loaded"));
        assert!(console.saw("error: no lines yet"));
        assert!(plotter.titles.is_empty());
    }

    #[test]
    fn identify_merges_picked_lines() {
        let mut session = ready_session(&[7000.0]);
        let mut plotter = StubPlotter {
            picks: vec![6200.0, 5500.0],
            ..StubPlotter::default()
        };
        let (_, console) = drive(&mut session, &["2", "7", "y"], &mut plotter);
        assert_eq!(session.lines().unwrap().values(), &[5500.0, 6200.0, 7000.0]);
        assert!(console.saw("2 line(s) added, 3 in list"));
    }

    #[test]
    fn remove_line_loops_until_zero() {
        let mut session = ready_session(&[5500.0, 6200.0, 7000.0]);
        let mut plotter = StubPlotter::default();
        let script = ["6", "1", "5", "x", "2", "0", "3", "7", "y"];
        let (end, console) = drive(&mut session, &script, &mut plotter);
        assert_eq!(end, SessionEnd::Quit);
        assert_eq!(session.lines().unwrap().values(), &[5500.0, 7000.0]);
        assert!(console.saw("error: no line at position 5 (valid: 1-3)"));
        assert!(console.saw("Could not parse input 'x'"));
        assert!(console.saw("Removed 6200.000 from position 2"));
        assert!(console.saw("( 1):  5500.00, ( 2):  6200.00, ( 3):  7000.00"));
    }

    #[test]
    fn removing_every_line_leaves_edit_menu() {
        let mut session = ready_session(&[5500.0]);
        let mut plotter = StubPlotter::default();
        let (end, console) = drive(&mut session, &["6", "1", "1", "7", "y"], &mut plotter);
        assert_eq!(end, SessionEnd::Quit);
        assert!(session.lines().unwrap().is_empty());
        assert!(console.saw("error: no lines yet"));
    }

    #[test]
    fn clearing_needs_exact_token() {
        let mut session = ready_session(&[5500.0, 6200.0]);
        let mut plotter = StubPlotter::default();
        let (_, console) = drive(&mut session, &["6", "2", "confirm", "2", "CONFIRM", "7", "y"], &mut plotter);
        assert!(console.saw("Clear cancelled"));
        assert!(console.saw("All lines cleared"));
        assert!(session.lines().is_none());
    }

    #[test]
    fn value_prompts_reprompt_until_valid_or_cancelled() {
        let mut session = ready_session(&[5500.0, 6200.0]);
        let mut plotter = StubPlotter::default();
        let script = [
            "3", "4", "0", "-1", "101", "abc", "7.5", "5", "1.5", "9", "2", "4", "", "7", "7", "y",
        ];
        let (end, console) = drive(&mut session, &script, &mut plotter);
        assert_eq!(end, SessionEnd::Quit);
        assert_eq!(session.config().half_width, HalfWidth::Fixed(7.5));
        assert_eq!(session.config().degree, 2);
        assert_eq!(console.output.iter().filter(|o| o.starts_with("error: dX must be")).count(), 3);
        assert!(console.saw("Could not parse input '1.5'"));
        assert!(console.saw("error: degree must be between 0 and 6 (got 9)"));
    }

    #[test]
    fn fit_workflow_runs_plots_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model.json");
        let out_arg = out.display().to_string();

        let mut session = ready_session(&[5500.0, 6200.0, 7000.0]);
        let mut plotter = StubPlotter::default();
        let script = ["3", "2", "6", "1", "2", "6", out_arg.as_str(), "3", "abc", "7", "7", "y"];
        let (_, console) = drive(&mut session, &script, &mut plotter);

        assert!(console.saw("error: no resolution model yet"));
        assert!(console.saw("3 of 3 succeeded"));
        assert_eq!(plotter.titles, vec!["Line profile fits", "Resolution model (degree 1)"]);
        assert!(out.exists());
        assert!(console.saw("Could not parse input 'abc'"));
    }

    #[test]
    fn load_failure_stays_in_load_menu() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("sky.txt");
        std::fs::write(&good, "5000 1.0 0.1\n5001 2.0 0.1\n5002 1.0 0.1\n").unwrap();
        let missing = dir.path().join("missing.txt").display().to_string();
        let good_arg = good.display().to_string();

        let mut session = Session::new(SessionConfig::default());
        let mut plotter = StubPlotter::default();
        let script = ["1", "1", missing.as_str(), "1", "", "1", good_arg.as_str(), "7", "y"];
        let (end, console) = drive(&mut session, &script, &mut plotter);

        assert_eq!(end, SessionEnd::Quit);
        assert!(console.saw("error: could not find file"));
        assert!(console.saw("Loaded 3 samples (5000.000 - 5002.000)"));
        assert_eq!(session.spectrum().map(Spectrum::len), Some(3));
    }
}
