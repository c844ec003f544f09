pub mod grid_analyses;

use tokio_postgres::Row;

pub fn from_rows<A>(rows: Vec<Row>) -> anyhow::Result<Vec<A>>
where
    A: for<'a> TryFrom<&'a Row, Error = anyhow::Error>,
{
    rows.iter().map(A::try_from).collect()
}
