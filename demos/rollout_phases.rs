//! The same invoice checked under two rollout phases side by side.

use nfe_rtc::core::*;
use rust_decimal_macros::dec;

fn main() {
    // Item 2 comes from a system that does not emit IBS/CBS yet.
    let invoice = InvoiceBuilder::new()
        .number("1001")
        .add_item(
            LineItemBuilder::new(1, dec!(1000.00))
                .icms("00", dec!(1000.00), dec!(18))
                .pis("01", dec!(1000.00), dec!(1.65))
                .cofins("01", dec!(1000.00), dec!(7.60))
                .ibs_cbs_pilot("000", "000001")
                .build(),
        )
        .add_item(
            LineItemBuilder::new(2, dec!(300.00))
                .icms("00", dec!(300.00), dec!(18))
                .pis("01", dec!(300.00), dec!(1.65))
                .cofins("01", dec!(300.00), dec!(7.60))
                .build(),
        )
        .derive_totals()
        .build();

    let phases = [
        ("2026 pilot", ValidationConfig::pilot_2026()),
        ("mandatory, 2027 rates", ValidationConfig::mandatory(dec!(0.10), dec!(8.80))),
    ];

    for (name, config) in &phases {
        let report = check_invoice(&invoice, config);
        let counts = report.status_counts();
        println!(
            "{name}: {} pass, {} warning, {} fail",
            counts.pass, counts.warning, counts.fail
        );
        for result in report.checklist.iter().filter(|r| !r.is_pass()) {
            println!("  {} {result}", result.status.symbol());
        }
    }
}
