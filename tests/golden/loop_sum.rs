fn main() {
    let mut sum: f64 = 0.0;
    for i in ((0.0 as i64))..((5.0 as i64)) {
        sum = (sum + (i as f64));
    }
    println!("{:?}", sum);
}
