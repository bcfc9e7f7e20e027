//! Scraped-page extraction for the WebForms booking portal.
//!
//! The portal renders both grids as plain `<table>` markup with image
//! buttons for slot states, so targeted regexes over the table section are
//! enough; no DOM is built.

use chrono::NaiveDate;
use regex::Regex;
use slotpulse_core::slots::{Booking, Slot, DATE_FORMAT};

pub const SLOT_TABLE_ID: &str = "ctl00_ContentPlaceHolder1_gvLatestav";
pub const BOOKED_TABLE_ID: &str = "ctl00_ContentPlaceHolder1_gvBooked";
pub const FULL_BOOK_MSG_ID: &str = "ctl00_ContentPlaceHolder1_lblFullBookMsg";
pub const BALANCE_LABEL_ID: &str = "ctl00_HeaderSub_lblStoreValue";

/// Slot-state gif the portal swaps a button to once it is reserved.
pub const RESERVED_GIF: &str = "images2.gif";
const AVAILABLE_GIF: &str = "images1.gif";

/// Compiled extraction patterns, built once per adapter.
pub struct PageExtractor {
    row_re: Regex,
    cell_re: Regex,
    input_re: Regex,
    name_re: Regex,
    src_re: Regex,
    tag_re: Regex,
    alert_re: Regex,
    balance_re: Regex,
}

impl PageExtractor {
    pub fn new() -> Self {
        Self {
            row_re: Regex::new(r"(?s)<tr[^>]*>(.*?)</tr>").expect("valid row regex"),
            cell_re: Regex::new(r"(?s)<td[^>]*>(.*?)</td>").expect("valid cell regex"),
            input_re: Regex::new(r"(?s)<input[^>]+>").expect("valid input regex"),
            name_re: Regex::new(r#"name="([^"]+)""#).expect("valid name regex"),
            src_re: Regex::new(r#"src="([^"]*)""#).expect("valid src regex"),
            tag_re: Regex::new(r"<[^>]+>").expect("valid tag regex"),
            alert_re: Regex::new(r"alert\('([^']*)'\)").expect("valid alert regex"),
            balance_re: Regex::new(&format!(r#"id="{}"[^>]*>([^<]*)<"#, BALANCE_LABEL_ID))
                .expect("valid balance regex"),
        }
    }

    /// Available slots from the booking grid, in page order. Rows and
    /// buttons that do not fit the expected shape are skipped.
    pub fn available_slots(&self, body: &str) -> Vec<Slot> {
        let Some(section) = table_section(body, SLOT_TABLE_ID) else {
            return Vec::new();
        };

        let mut slots = Vec::new();
        for row in self.row_re.captures_iter(section) {
            let row_html = &row[1];
            let cells: Vec<String> = self
                .cell_re
                .captures_iter(row_html)
                .map(|c| self.cell_text(&c[1]))
                .collect();
            if cells.len() < 2 {
                continue;
            }
            let date = cells[0].clone();
            let weekday = cells[1].clone();

            let mut session = 0u8;
            for input in self.input_re.find_iter(row_html) {
                let tag = input.as_str();
                let Some(src) = self.src_re.captures(tag) else {
                    continue;
                };
                session += 1;
                let gif = src[1]
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_lowercase();
                if gif != AVAILABLE_GIF {
                    continue;
                }
                let Some(name) = self.name_re.captures(tag) else {
                    log::warn!("Available slot button without a name on {}", date);
                    continue;
                };
                slots.push(Slot {
                    date: date.clone(),
                    weekday: weekday.clone(),
                    session,
                    handle: name[1].to_string(),
                });
            }
        }
        log::info!("Found {} available slots.", slots.len());
        slots
    }

    /// Confirmed bookings for one course from the dashboard table. Rows
    /// that fail to parse are logged and skipped.
    pub fn bookings(&self, body: &str, course_name: &str) -> Vec<Booking> {
        let Some(section) = table_section(body, BOOKED_TABLE_ID) else {
            return Vec::new();
        };

        let mut bookings = Vec::new();
        for row in self.row_re.captures_iter(section) {
            let cells: Vec<String> = self
                .cell_re
                .captures_iter(&row[1])
                .map(|c| self.cell_text(&c[1]))
                .collect();
            if cells.len() < 5 {
                continue;
            }
            if cells[4] != course_name {
                continue;
            }
            let date = NaiveDate::parse_from_str(&cells[0], DATE_FORMAT);
            let session = cells[1].parse::<u8>();
            match (date, session) {
                (Ok(date), Ok(session)) => bookings.push(Booking { date, session }),
                _ => {
                    log::error!("Failed to parse booking row {:?}", &cells[..2]);
                }
            }
        }
        bookings
    }

    /// The reservation button's current state gif on a freshly served page,
    /// if the button is still present.
    pub fn button_gif(&self, body: &str, handle: &str) -> Option<String> {
        for input in self.input_re.find_iter(body) {
            let tag = input.as_str();
            let Some(name) = self.name_re.captures(tag) else {
                continue;
            };
            if &name[1] != handle {
                continue;
            }
            let src = self.src_re.captures(tag)?;
            return Some(
                src[1]
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_lowercase(),
            );
        }
        None
    }

    /// Text of a blocking dialog injected into the response, if any.
    pub fn alert_text(&self, body: &str) -> Option<String> {
        self.alert_re
            .captures(body)
            .map(|caps| caps[1].trim().to_string())
            .filter(|text| !text.is_empty())
    }

    /// Account balance from the header label, e.g. `$245.60`.
    pub fn balance(&self, body: &str) -> Option<f64> {
        let caps = self.balance_re.captures(body)?;
        caps[1].trim().trim_start_matches('$').replace(',', "").parse().ok()
    }

    /// The grid is replaced by a fully-booked banner when nothing is open;
    /// the banner markup only appears in that state.
    pub fn is_fully_booked(&self, body: &str) -> bool {
        match tag_containing(body, FULL_BOOK_MSG_ID) {
            Some(tag) => !tag.replace(' ', "").contains("display:none"),
            None => false,
        }
    }

    fn cell_text(&self, cell_html: &str) -> String {
        self.tag_re.replace_all(cell_html, "").trim().to_string()
    }
}

fn table_section<'a>(body: &'a str, table_id: &str) -> Option<&'a str> {
    let start = body.find(table_id)?;
    let rest = &body[start..];
    let end = rest.find("</table>")?;
    Some(&rest[..end])
}

fn tag_containing<'a>(body: &'a str, id: &str) -> Option<&'a str> {
    let at = body.find(id)?;
    let open = body[..at].rfind('<')?;
    let close = body[at..].find('>')? + at;
    Some(&body[open..=close])
}
