// ABOUTME: Lunch menu lookup for a fixed set of nearby restaurants
// ABOUTME: Fetches each restaurant's page with reqwest and extracts today's offer with scraper

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use chrono_tz::Tz;
use scraper::{Html, Selector};
use slackbot_core::Command;
use std::str::FromStr;
use std::time::Duration;

/// Restaurants the menu command knows about, in listing order
pub const RESTAURANTS: [&str; 3] = ["angel", "hisa", "menza"];

const USER_AGENT: &str = concat!("slackbot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restaurant {
    Angel,
    Hisa,
    Menza,
}

impl FromStr for Restaurant {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "angel" => Ok(Restaurant::Angel),
            "hisa" => Ok(Restaurant::Hisa),
            "menza" => Ok(Restaurant::Menza),
            _ => Err(()),
        }
    }
}

impl Restaurant {
    pub fn url(&self) -> &'static str {
        match self {
            Restaurant::Angel => "http://www.kaval-group.si/ANGEL,,ponudba/kosila",
            Restaurant::Hisa => {
                "https://api.malcajt.com/getApiData.php?action=embed&id=2030&show=1001"
            }
            Restaurant::Menza => "https://www.studentska-prehrana.si/sl/restaurant/Details/2710",
        }
    }

    /// Extract today's offer from the restaurant's page.
    /// `weekday` counts from Monday = 0.
    pub fn parse(&self, html: &str, weekday: u32) -> Result<Vec<String>> {
        let document = Html::parse_document(html);
        match self {
            Restaurant::Angel => parse_angel(&document, weekday),
            Restaurant::Hisa => parse_hisa(&document),
            Restaurant::Menza => parse_menza(&document),
        }
    }
}

/// `menu [restaurant]`
pub struct MenuCommand {
    client: reqwest::Client,
    tz: Tz,
}

impl MenuCommand {
    pub fn new(timeout: Duration, tz: Tz) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for menu lookups")?;
        Ok(Self { client, tz })
    }

    async fn fetch(&self, restaurant: Restaurant) -> Result<String> {
        let response = self
            .client
            .get(restaurant.url())
            .send()
            .await
            .with_context(|| format!("fetching {}", restaurant.url()))?
            .error_for_status()
            .with_context(|| format!("fetching {}", restaurant.url()))?;

        // Decodes using the charset from Content-Type (Angel serves windows-1250)
        response
            .text()
            .await
            .with_context(|| format!("reading {}", restaurant.url()))
    }
}

#[async_trait]
impl Command for MenuCommand {
    fn name(&self) -> &str {
        "menu"
    }

    async fn exec(&self, args: &[String]) -> Result<Vec<u8>> {
        let Some(name) = args.get(1) else {
            return Ok(RESTAURANTS.join(" ").into_bytes());
        };

        let Ok(restaurant) = name.parse::<Restaurant>() else {
            return Ok(format!("Don't know {}!", name).into_bytes());
        };

        let html = self.fetch(restaurant).await?;
        let weekday = Utc::now()
            .with_timezone(&self.tz)
            .weekday()
            .num_days_from_monday();
        let lines = restaurant.parse(&html, weekday)?;
        tracing::debug!(restaurant = name.as_str(), lines = lines.len(), "Menu parsed");

        Ok(lines.join("\n").into_bytes())
    }
}

// =============================================================================
// Page parsers
// =============================================================================

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {:?}", css, e))
}

/// One `.show-<weekday>` block per day; every paragraph is a dish
fn parse_angel(document: &Html, weekday: u32) -> Result<Vec<String>> {
    let day = selector(&format!(".show-{} p", weekday))?;
    let mut lines = vec!["Ponudba v Piceriji Angel:".to_string()];

    for paragraph in document.select(&day) {
        let line = paragraph
            .inner_html()
            .replace("<strong>", "*")
            .replace("</strong>", "*")
            .replace("* *", "")
            .replace("<br>", "");
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    Ok(lines)
}

/// Today is the `#day0` tab; its link carries the date, its body the dishes
/// separated by line breaks with bold-italic headings
fn parse_hisa(document: &Html) -> Result<Vec<String>> {
    let tab = selector(r##"a[href="#day0"]"##)?;
    let body = selector("#day0")?;
    let mut lines = Vec::new();

    for link in document.select(&tab) {
        let date = link.text().collect::<String>();
        lines.push(format!("Ponudba v Dobri Hisi: *{}*", date.trim()));
    }

    for day in document.select(&body) {
        let html = day
            .inner_html()
            .replace('\u{2014}', "")
            .replace("<br></i></b>", "</i></b><br>")
            .replace("<b><i>", "*")
            .replace("</i></b>", "*");

        lines.extend(
            html.split("<br>")
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    if lines.is_empty() {
        return Err(anyhow!("no offer found for today"));
    }
    Ok(lines)
}

/// Dish names are upper-cased headings; render them as sentences
fn parse_menza(document: &Html) -> Result<Vec<String>> {
    let dish = selector("#menu-list .shadow-wrapper h5 strong")?;
    let mut lines = vec!["Ponudba v Menzi:".to_string()];

    for heading in document.select(&dish) {
        let name = heading.text().collect::<String>();
        let name = name.trim().to_lowercase();
        if !name.is_empty() {
            lines.push(capitalize(&name));
        }
    }

    lines.push(
        "\u{a9} 2016 \u{160}tudentska organizacija Slovenije \u{2013} Vse pravice pridr\u{17e}ane"
            .to_string(),
    );
    Ok(lines)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> MenuCommand {
        MenuCommand::new(Duration::from_secs(1), chrono_tz::UTC).unwrap()
    }

    fn args(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_menu_lists_restaurants() {
        let out = menu().exec(&args("menu")).await.unwrap();
        assert_eq!(out, b"angel hisa menza");
    }

    #[tokio::test]
    async fn test_menu_unknown_restaurant() {
        let out = menu().exec(&args("menu pizzahut")).await.unwrap();
        assert_eq!(out, b"Don't know pizzahut!");
    }

    #[test]
    fn test_restaurant_from_str() {
        assert_eq!("angel".parse::<Restaurant>(), Ok(Restaurant::Angel));
        assert_eq!("hisa".parse::<Restaurant>(), Ok(Restaurant::Hisa));
        assert_eq!("menza".parse::<Restaurant>(), Ok(Restaurant::Menza));
        assert!("Angel".parse::<Restaurant>().is_err());
    }

    #[test]
    fn test_parse_angel_picks_todays_block() {
        let html = r#"<html><body>
            <div class="show-0"><p><strong>Ponedeljek</strong></p><p>Pica margherita<br></p></div>
            <div class="show-1"><p><strong>Torek</strong></p><p>Lazanja</p><p>  </p></div>
        </body></html>"#;

        let lines = Restaurant::Angel.parse(html, 1).unwrap();
        assert_eq!(lines, vec!["Ponudba v Piceriji Angel:", "*Torek*", "Lazanja"]);
    }

    #[test]
    fn test_parse_angel_missing_day_has_only_title() {
        let lines = Restaurant::Angel.parse("<html></html>", 6).unwrap();
        assert_eq!(lines, vec!["Ponudba v Piceriji Angel:"]);
    }

    #[test]
    fn test_parse_hisa() {
        let html = r##"<html><body>
            <a href="#day0">Ponedeljek, 2. 1.</a><a href="#day1">Torek</a>
            <div id="day0"><b><i>Kosilo 1<br></i></b>Goveja juha<br>Dunajski zrezek &#8212;<br></div>
            <div id="day1">Jutri</div>
        </body></html>"##;

        let lines = Restaurant::Hisa.parse(html, 0).unwrap();
        assert_eq!(
            lines,
            vec![
                "Ponudba v Dobri Hisi: *Ponedeljek, 2. 1.*",
                "*Kosilo 1*",
                "Goveja juha",
                "Dunajski zrezek",
            ]
        );
    }

    #[test]
    fn test_parse_hisa_empty_page_is_error() {
        assert!(Restaurant::Hisa.parse("<html></html>", 0).is_err());
    }

    #[test]
    fn test_parse_menza() {
        let html = r#"<html><body><div id="menu-list">
            <div class="shadow-wrapper"><h5><strong> JOTA S KLOBASO</strong></h5></div>
            <div class="shadow-wrapper"><h5><strong>ŠPINAČNI NJOKI</strong></h5></div>
        </div></body></html>"#;

        let lines = Restaurant::Menza.parse(html, 0).unwrap();
        assert_eq!(lines[0], "Ponudba v Menzi:");
        assert_eq!(lines[1], "Jota s klobaso");
        assert_eq!(lines[2], "Špinačni njoki");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("jota"), "Jota");
        assert_eq!(capitalize("čevapčiči"), "Čevapčiči");
        assert_eq!(capitalize(""), "");
    }
}
