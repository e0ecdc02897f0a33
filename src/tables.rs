use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    core::{schedule::ScheduleResult, slot::Slot, transition::Transition},
    quantity::{Zero, cost::Cost, energy::Energy, price::Price},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

/// Prices at or above the median are highlighted as expensive.
fn median_price(prices: impl Iterator<Item = Price>) -> Price {
    let prices = prices.sorted().collect_vec();
    prices.get(prices.len() / 2).copied().unwrap_or(Price::ZERO)
}

fn price_cell(price: Price, median: Price) -> Cell {
    Cell::new(price)
        .set_alignment(CellAlignment::Right)
        .fg(if price >= median { Color::Red } else { Color::Green })
}

fn energy_cell(energy: Energy) -> Cell {
    Cell::new(energy).set_alignment(CellAlignment::Right)
}

pub fn build_schedule_table(slots: &[Slot], schedule: &[Transition]) -> Table {
    let median = median_price(slots.iter().map(|slot| slot.price));

    let mut table = new_table();
    table.set_header(vec![
        "Slot",
        "Price",
        "Net demand",
        "Action",
        "Before",
        "After",
        "Grid",
        "Cost",
    ]);
    for (transition, slot) in schedule.iter().zip(slots) {
        table.add_row(vec![
            Cell::new(transition.slot).add_attribute(Attribute::Dim),
            price_cell(transition.price, median),
            energy_cell(slot.net_demand()),
            Cell::new(transition.action).fg(transition.action.kind().color()),
            energy_cell(transition.state_before).add_attribute(Attribute::Dim),
            energy_cell(transition.state_after),
            energy_cell(transition.grid_exchange).fg(if transition.grid_exchange > Energy::ZERO {
                Color::Red
            } else {
                Color::Green
            }),
            Cell::new(transition.cost)
                .set_alignment(CellAlignment::Right)
                .fg(if transition.cost > Cost::ZERO { Color::Red } else { Color::Green }),
        ]);
    }
    table
}

pub fn build_summary_table(result: &ScheduleResult) -> Table {
    let diagnostics = &result.diagnostics;
    let mut table = new_table();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Strategy"), Cell::new(format!("{:?}", diagnostics.strategy))]);
    table.add_row(vec![
        Cell::new("Total cost"),
        Cell::new(result.total_cost).add_attribute(Attribute::Bold),
    ]);
    if let (Some(baseline_cost), Some(savings)) = (result.baseline_cost, result.savings()) {
        table.add_row(vec![Cell::new("Without battery"), Cell::new(baseline_cost)]);
        table.add_row(vec![
            Cell::new("Savings"),
            Cell::new(savings).fg(if savings >= Cost::ZERO { Color::Green } else { Color::Red }),
        ]);
    }
    table.add_row(vec![
        Cell::new("Optimal"),
        Cell::new(if result.is_optimal { "yes" } else { "not proven" }).fg(
            if result.is_optimal { Color::Green } else { Color::DarkYellow },
        ),
    ]);
    table.add_row(vec![Cell::new("Nodes"), Cell::new(diagnostics.nodes)]);
    table.add_row(vec![Cell::new("Candidates"), Cell::new(diagnostics.candidates)]);
    table.add_row(vec![Cell::new("Improvements"), Cell::new(diagnostics.improvements)]);
    table.add_row(vec![
        Cell::new("Elapsed"),
        Cell::new(humantime::format_duration(diagnostics.elapsed)).add_attribute(Attribute::Dim),
    ]);
    table
}

pub fn build_slots_table(slots: &[Slot]) -> Table {
    let median = median_price(slots.iter().map(|slot| slot.price));

    let mut table = new_table();
    table.set_header(vec!["Slot", "Price", "Export price", "Production", "Consumption", "Net"]);
    for (index, slot) in slots.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).add_attribute(Attribute::Dim),
            price_cell(slot.price, median),
            slot.export_price.map_or_else(
                || Cell::new("-").add_attribute(Attribute::Dim),
                |export_price| Cell::new(export_price).set_alignment(CellAlignment::Right),
            ),
            energy_cell(slot.production),
            energy_cell(slot.consumption),
            energy_cell(slot.net_demand()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median() {
        assert_eq!(median_price([Price(3), Price(1), Price(2)].into_iter()), Price(2));
        assert_eq!(median_price(std::iter::empty()), Price::ZERO);
    }
}
