use crate::workflows::analyze::AnalysisResults;
use std::io::{self, Write};

const RULE_HEAVY: &str = " ========================================================";
const RULE_LIGHT: &str = " --------------------------------------------------------";

/// Provenance lines printed at the top of a results file so a study can be
/// traced back to the invocation that produced it.
#[derive(Debug, Clone, Default)]
pub struct ReportHeader {
    pub version: String,
    pub cwd: String,
    pub timestamp: String,
    pub user: String,
    pub command: String,
}

/// Duplicates everything written to it into two sinks, so results land in
/// the output file and on the console in one pass.
pub struct Tee<A: Write, B: Write> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// Writes the full results block: header, input summary, then one section
/// per estimator that actually ran. Values are converted to the requested
/// unit on the way out.
pub fn write_report(
    out: &mut dyn Write,
    header: &ReportHeader,
    results: &AnalysisResults,
) -> io::Result<()> {
    let factor = results.unit.factor(results.temperature);
    let unit = results.unit.label();
    let prec = results.precision;
    let quantity = |value: f64| format!("{:.prec$} {unit}", value * factor);
    let optional = |value: Option<f64>| match value {
        Some(v) => quantity(v),
        None => "not requested".to_string(),
    };

    writeln!(out, "# fepflow analyze, version {}", header.version)?;
    writeln!(out, "# pwd = {}", header.cwd)?;
    writeln!(out, "# {} ({})", header.timestamp, header.user)?;
    writeln!(out, "# command = {}", header.command)?;
    writeln!(out)?;
    writeln!(out, "{RULE_HEAVY}")?;
    writeln!(out, "                       ANALYSIS")?;
    writeln!(out, "{RULE_HEAVY}")?;
    writeln!(
        out,
        "  Number of forward (0->1) trajectories: {}",
        results.forward.len()
    )?;
    writeln!(
        out,
        "  Number of reverse (1->0) trajectories: {}",
        results.reverse.len()
    )?;
    writeln!(out, "  Temperature : {:.2} K", results.temperature)?;

    if let Some(crooks) = &results.crooks {
        writeln!(out, "{RULE_LIGHT}")?;
        writeln!(out, "             Crooks Gaussian Intersection")?;
        writeln!(out, "{RULE_LIGHT}")?;
        writeln!(
            out,
            "  CGI: Forward: gaussian mean = {} std = {}",
            quantity(crooks.mean_forward),
            quantity(crooks.std_forward)
        )?;
        writeln!(
            out,
            "  CGI: Reverse: gaussian mean = {} std = {}",
            quantity(crooks.mean_reverse),
            quantity(crooks.std_reverse)
        )?;
        if !crooks.intersects {
            writeln!(
                out,
                "  CGI: The distributions do not intersect; using the mean of the means."
            )?;
        }
        writeln!(out, "  CGI: dG = {}", quantity(crooks.dg))?;
        writeln!(
            out,
            "  CGI: Std Err (parametric bootstrap) = {}",
            quantity(crooks.err_boot_parametric)
        )?;
        writeln!(
            out,
            "  CGI: Std Err (bootstrap) = {}",
            optional(crooks.err_boot)
        )?;
        writeln!(
            out,
            "  CGI: Std Err (blocks) = {}",
            optional(crooks.err_blocks)
        )?;
    }

    if let (Some(ks_f), Some(ks_r)) = (&results.ks_forward, &results.ks_reverse) {
        writeln!(out, "{RULE_LIGHT}")?;
        writeln!(out, "             Kolmogorov-Smirnov normality test")?;
        writeln!(out, "{RULE_LIGHT}")?;
        for (label, ks) in [("Forward", ks_f), ("Reverse", ks_r)] {
            writeln!(
                out,
                "  KS: {label}: gaussian quality = {:.2} (accept below {:.2})",
                ks.quality, ks.lambda0
            )?;
            if ks.ok {
                writeln!(out, "  KS: {label}: ---> Ok")?;
            } else {
                writeln!(out, "  KS: {label}: ---> Not a gaussian!")?;
            }
        }
    }

    if let Some(bar) = &results.bar {
        writeln!(out, "{RULE_LIGHT}")?;
        writeln!(out, "             Bennett Acceptance Ratio")?;
        writeln!(out, "{RULE_LIGHT}")?;
        writeln!(out, "  BAR: dG = {}", quantity(bar.dg))?;
        writeln!(out, "  BAR: Std Err (analytical) = {}", quantity(bar.err))?;
        writeln!(out, "  BAR: Std Err (bootstrap) = {}", optional(bar.err_boot))?;
        writeln!(out, "  BAR: Std Err (blocks) = {}", optional(bar.err_blocks))?;
        writeln!(out, "  BAR: Conv = {:.prec$}", bar.conv)?;
        match bar.conv_err_boot {
            Some(err) => writeln!(out, "  BAR: Conv Std Err (bootstrap) = {err:.prec$}")?,
            None => writeln!(out, "  BAR: Conv Std Err (bootstrap) = not requested")?,
        }
    }

    if let Some(jarz) = &results.jarz {
        writeln!(out, "{RULE_LIGHT}")?;
        writeln!(out, "             Jarzynski estimator")?;
        writeln!(out, "{RULE_LIGHT}")?;
        writeln!(out, "  JARZ: dG Forward = {}", quantity(jarz.dg_forward))?;
        writeln!(out, "  JARZ: dG Reverse = {}", quantity(jarz.dg_reverse))?;
        writeln!(out, "  JARZ: dG Mean    = {}", quantity(jarz.dg_mean))?;
        writeln!(
            out,
            "  JARZ: Std Err Forward (bootstrap) = {}",
            optional(jarz.err_boot_forward)
        )?;
        writeln!(
            out,
            "  JARZ: Std Err Reverse (bootstrap) = {}",
            optional(jarz.err_boot_reverse)
        )?;
        writeln!(
            out,
            "  JARZ: Std Err Forward (blocks) = {}",
            optional(jarz.err_blocks_forward)
        )?;
        writeln!(
            out,
            "  JARZ: Std Err Reverse (blocks) = {}",
            optional(jarz.err_blocks_reverse)
        )?;
    }

    writeln!(out, "{RULE_HEAVY}")?;
    out.flush()
}
