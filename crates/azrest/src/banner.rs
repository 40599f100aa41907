//! ASCII art banner for the azrest CLI

use colored::Colorize;

const LOGO: &str = r#"
  █████╗ ███████╗██████╗ ███████╗███████╗████████╗
 ██╔══██╗╚══███╔╝██╔══██╗██╔════╝██╔════╝╚══██╔══╝
 ███████║  ███╔╝ ██████╔╝█████╗  ███████╗   ██║
 ██╔══██║ ███╔╝  ██╔══██╗██╔══╝  ╚════██║   ██║
 ██║  ██║███████╗██║  ██║███████╗███████║   ██║
 ╚═╝  ╚═╝╚══════╝╚═╝  ╚═╝╚══════╝╚══════╝   ╚═╝"#;

pub fn print_banner() {
    for line in LOGO.lines() {
        println!("{}", line.bold());
    }
}

/// Print the banner with version info
pub fn print_banner_with_version() {
    print_banner();
    println!(
        " {} {}",
        "Azure REST from the command line".dimmed(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed(),
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logo_has_six_lines() {
        let lines: Vec<&str> = LOGO.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 6);
    }
}
