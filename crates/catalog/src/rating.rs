/// Mean of the given review ratings, rounded to one decimal place.
///
/// `None` when there are no ratings.
pub fn average_rating<I>(ratings: I) -> Option<f64>
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r), count + 1));

    if count == 0 {
        return None;
    }

    let mean = sum as f64 / count as f64;
    Some((mean * 10.0).round() / 10.0)
}
