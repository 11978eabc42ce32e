use std::io::{self, Write};
use crossterm::{queue, style::{ResetColor, SetForegroundColor}};

use crate::model::ServerStat;
use super::shared::{progress_bar, usage_color, write_dim, write_section_header, writeln};

const BAR_WIDTH: usize = 30;

pub fn render_stats(out: &mut impl Write, stats: Option<ServerStat>) -> io::Result<()> {
    write_section_header(out, " SERVER", false)?;

    let Some(stats) = stats else {
        write_dim(out, "  Loading...")?;
        return writeln(out, "");
    };

    for (label, value) in [("CPU", stats.cpu), ("Memory", stats.memory), ("Disk", stats.disk)] {
        write!(out, "  {:<8}", label)?;
        queue!(out, SetForegroundColor(usage_color(value)))?;
        write!(out, "{}", progress_bar(f64::from(value), BAR_WIDTH))?;
        queue!(out, ResetColor)?;
        write!(out, " {:>3}%\r\n", value)?;
    }
    writeln(out, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_loading_before_first_sample() {
        let mut buf = Vec::new();
        render_stats(&mut buf, None).unwrap();
        assert!(String::from_utf8_lossy(&buf).contains("Loading..."));
    }

    #[test]
    fn renders_each_percentage() {
        let mut buf = Vec::new();
        render_stats(&mut buf, Some(ServerStat { cpu: 7, memory: 55, disk: 100 })).unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("  7%"));
        assert!(text.contains(" 55%"));
        assert!(text.contains("100%"));
    }
}
