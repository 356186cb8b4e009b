//! Welcome banner

use colored::Colorize;

const LOGO: &str = r#" _____ _______   _______
|_   _|_   _\ \ / /  ___|
  | |   | |  \ V /| |_
  | |   | |   \ / |  _|
  |_|   |_|   |_| |_|"#;

/// Banner text: logo plus tagline with version.
pub fn render() -> String {
    format!(
        "{}\n{} {}\n",
        LOGO.cyan().bold(),
        "Track Your Finances".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    )
}

pub fn print() {
    println!("{}", render());
}
