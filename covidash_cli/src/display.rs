use comfy_table::{presets::NOTHING, *};

use covidash::{aggregate::GlobalTotals, sink::WrittenOutput};

fn bordered_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        )
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn outputs_table(outputs: &[WrittenOutput]) -> Table {
    let mut table = bordered_table(vec!["Output", "Rows"]);
    for output in outputs {
        table.add_row(vec![
            Cell::new(output.path.display()),
            Cell::new(output.rows).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn totals_table(totals: &GlobalTotals) -> Table {
    let mut table = bordered_table(vec!["Global summary", &totals.date.to_string()]);
    for (label, value) in [
        ("Total Confirmed", totals.confirmed),
        ("Total Deaths", totals.deaths),
        ("Total Recovered", totals.recovered),
        ("Total Active", totals.active),
    ] {
        table.add_row(vec![
            Cell::new(label).add_attribute(Attribute::Bold),
            Cell::new(format!("{value:.0}")).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn resolved_table(resolved: &[(String, Option<String>)]) -> Table {
    let mut table = bordered_table(vec!["Name", "ISO 3166-1 alpha-3"]);
    for (name, code) in resolved {
        table.add_row(vec![name.as_str(), code.as_deref().unwrap_or("-")]);
    }
    table
}

pub fn display_outputs(outputs: &[WrittenOutput]) {
    println!("\n{}", outputs_table(outputs));
}

pub fn display_totals(totals: Option<&GlobalTotals>) {
    match totals {
        Some(totals) => println!("\n{}", totals_table(totals)),
        None => println!("No case records with a valid date."),
    }
}

pub fn display_resolved(resolved: &[(String, Option<String>)]) {
    println!("\n{}", resolved_table(resolved));
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn outputs_table_lists_paths_and_rows() {
        let table = outputs_table(&[WrittenOutput {
            path: PathBuf::from("data/covid.csv"),
            rows: 289,
        }]);
        let rendered = table.to_string();
        assert!(rendered.contains("data/covid.csv"));
        assert!(rendered.contains("289"));
    }

    #[test]
    fn totals_table_shows_every_figure() {
        let table = totals_table(&GlobalTotals {
            date: NaiveDate::from_ymd_opt(2023, 3, 9).unwrap(),
            confirmed: 676570149.0,
            deaths: 6881802.0,
            recovered: 0.0,
            active: 669688347.0,
        });
        let rendered = table.to_string();
        assert!(rendered.contains("2023-03-09"));
        assert!(rendered.contains("676570149"));
        assert!(rendered.contains("Total Active"));
    }

    #[test]
    fn unresolved_names_are_shown_as_dash() {
        let rendered = resolved_table(&[
            ("Germany".into(), Some("DEU".into())),
            ("Diamond Princess".into(), None),
        ])
        .to_string();
        assert!(rendered.contains("DEU"));
        assert!(rendered
            .lines()
            .any(|line| line.contains("Diamond Princess") && line.contains('-')));
    }
}
