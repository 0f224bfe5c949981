fn add(a: f64, b: f64) -> f64 {
    return (a + b);
}

fn twice(v: f64) -> f64 {
    return add(v, v);
}

fn main() {
    println!("{:?}", twice(7.0));
}
