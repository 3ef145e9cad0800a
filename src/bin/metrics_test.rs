use prodlog::entry::EntryField;
use prodlog::form::{FormError, ProductionForm};
use prodlog::measurement::Measurement;
use prodlog::metrics::{self, round_to};
use prodlog::specs::TargetSpecifications;
use prodlog::{ProductionEntry, RowState};

const LABEL: &str =
    "2.000*^2.020*^1.980*^2.030*^1.970*^0.040*^2.0*^1.5*^0.180*^0.220*^1.0*^1.2*^10*^450*^1.00*^3";

fn entry(od_max: f64, od_min: f64, actual_wt: f64) -> ProductionEntry {
    ProductionEntry {
        od_maximum: Measurement::Value(od_max),
        od_minimum: Measurement::Value(od_min),
        actual_wt_per_ft: Measurement::Value(actual_wt),
        ..ProductionEntry::default()
    }
}

fn specs(theo: f64) -> TargetSpecifications {
    TargetSpecifications {
        theo_wt_per_ft: Measurement::Value(theo),
        ..TargetSpecifications::default()
    }
}

// Derived statistics on the worked examples
fn test_worked_examples() {
    println!("\n====== Testing derived metrics ======");
    let m = metrics::compute(&entry(2.010, 1.990, 0.0), &TargetSpecifications::default());
    assert_eq!(m.out_of_round, 0.02);
    assert_eq!(m.ovality, 1.0);
    println!("✓ odMaximum 2.010 / odMinimum 1.990 gives outOfRound 0.020 and ovality 1.000");

    let m = metrics::compute(&entry(0.0, 0.0, 1.05), &specs(1.00));
    assert_eq!((m.gain, m.loss), (0.0, 5.0));
    println!("✓ 1.05 against 1.00 lb/ft is a 5.00% loss");

    let m = metrics::compute(&entry(0.0, 0.0, 0.95), &specs(1.00));
    assert_eq!((m.gain, m.loss), (5.0, 0.0));
    println!("✓ 0.95 against 1.00 lb/ft is a 5.00% gain");
}

fn test_properties() {
    println!("\n====== Testing metric properties ======");
    let readings = [0.0, 0.5, 1.25, 1.99, 2.0, 2.015, 3.3];
    for max in readings {
        for min in readings {
            let m = metrics::compute(&entry(max, min, max), &specs(min));
            assert_eq!(m.out_of_round, round_to(max - min, 3));
            if max + min == 0.0 {
                assert_eq!(m.ovality, 0.0);
            } else {
                assert_eq!(m.ovality, round_to((max - min) / (max + min) * 200.0, 3));
            }
            assert!(m.gain == 0.0 || m.loss == 0.0);
        }
    }
    println!("✓ outOfRound and ovality match their formulas on {} pairs", readings.len() * readings.len());
    println!("✓ gain and loss are never both non-zero");
}

fn test_row_lifecycle() {
    println!("\n====== Testing row lifecycle ======");
    let mut form = ProductionForm::new("form-1");
    form.apply_qr_payload(LABEL).unwrap();

    form.edit_entry(0, EntryField::Start, "06:00").unwrap();
    let before = form.entries().to_vec();
    assert!(matches!(form.add_entry(), Err(FormError::IncompleteRow { .. })));
    assert_eq!(form.entries(), &before[..]);
    println!("✓ Adding a row after an incomplete row is rejected without changes");

    assert_eq!(form.remove_entry(0, true), Err(FormError::LastRemainingRow));
    println!("✓ The only remaining row cannot be removed");

    for (field, value) in [
        (EntryField::End, "07:00"),
        (EntryField::OdAverage, "2.0"),
        (EntryField::OdMaximum, "2.01"),
        (EntryField::OdMinimum, "1.99"),
        (EntryField::OdEnd, "2.0"),
        (EntryField::WallMinimum, "0.19"),
        (EntryField::WallMaximum, "0.21"),
        (EntryField::OdAtSaw, "2.0"),
        (EntryField::OdAtVacTank, "2.0"),
        (EntryField::MeltPress, "3000"),
        (EntryField::UnitStart, "1"),
        (EntryField::UnitEnd, "25"),
        (EntryField::ActualPph, "445"),
        (EntryField::ActualWtPerFt, "1.01"),
        (EntryField::AcceptedFt, "900"),
        (EntryField::AcceptedLbs, "909"),
        (EntryField::ScrapFts, "0"),
        (EntryField::ScrapLbs, "0"),
        (EntryField::ScrapCode, "A"),
        (EntryField::RegrindConsumed, "4"),
    ] {
        form.edit_entry(0, field, value).unwrap();
    }
    let row = form.add_entry().unwrap();
    assert_eq!(form.entries()[0].state, RowState::Locked);
    assert_eq!(form.entries()[row].start, "07:00");
    assert_eq!(form.entries()[row].unit_start, Measurement::Value(26.0));
    println!("✓ New row starts at 07:00 with unit 26 and the previous row is locked");
}

fn main() {
    test_worked_examples();
    test_properties();
    test_row_lifecycle();
    println!("\nAll metrics tests passed!");
}
