use super::*;

fn square(side: f64) -> Ring {
    vec![[0.0, 0.0], [side, 0.0], [side, side], [0.0, side]]
}

#[test]
fn square_of_side_100_is_one_hectare() {
    let geometry = Geometry::polygon(square(100.0));
    assert!((geometry.area() - 10_000.0).abs() < f64::EPSILON);
    assert_eq!(format_area(geometry.area()), "Area = 1 hectares");
}

#[test]
fn format_area_rounds_to_three_decimals() {
    assert_eq!(format_area(12_345.678), "Area = 1.235 hectares");
    assert_eq!(format_area(6.0), "Area = 0.001 hectares");
    assert_eq!(format_area(4.0), "Area = 0 hectares");
    assert_eq!(format_area(0.0), "Area = 0 hectares");
}

#[test]
fn polygon_closes_open_ring() {
    let geometry = Geometry::polygon(square(10.0));
    let outer = &geometry.rings()[0];
    assert_eq!(outer.len(), 5);
    assert_eq!(outer.first(), outer.last());
}

#[test]
fn polygon_keeps_closed_ring_as_is() {
    let mut ring = square(10.0);
    ring.push([0.0, 0.0]);
    let geometry = Geometry::polygon(ring);
    assert_eq!(geometry.rings()[0].len(), 5);
}

#[test]
fn area_ignores_winding_direction() {
    let mut clockwise = square(20.0);
    clockwise.reverse();
    assert!((ring_area(&clockwise) - 400.0).abs() < f64::EPSILON);
}

#[test]
fn holes_are_subtracted_from_area() {
    let outer = close_ring(square(100.0));
    let hole = close_ring(vec![[10.0, 10.0], [20.0, 10.0], [20.0, 20.0], [10.0, 20.0]]);
    let geometry = Geometry::Polygon(vec![outer, hole]);
    assert!((geometry.area() - 9_900.0).abs() < f64::EPSILON);
}

#[test]
fn length_is_perimeter_of_outer_ring() {
    let geometry = Geometry::polygon(square(25.0));
    assert!((geometry.length() - 100.0).abs() < f64::EPSILON);
    assert!((ring_length(&square(25.0)) - 100.0).abs() < f64::EPSILON);
}

#[test]
fn degenerate_rings_are_detected() {
    assert!(Geometry::polygon(vec![[0.0, 0.0], [1.0, 1.0]]).is_degenerate());
    assert!(Geometry::Polygon(vec![]).is_degenerate());
    assert!(!Geometry::polygon(square(1.0)).is_degenerate());
}

#[test]
fn geometry_serializes_as_geojson_polygon() {
    let geometry = Geometry::polygon(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
    let value = serde_json::to_value(&geometry).unwrap();
    assert_eq!(value["type"], "Polygon");
    assert_eq!(value["coordinates"][0][3], serde_json::json!([0.0, 0.0]));
}
