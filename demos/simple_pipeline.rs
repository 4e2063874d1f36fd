// Simple pipeline example
// Author: Gabriel Demetrios Lafis

use rust_data_transformation_engine::{
    data::{Cell, ColumnFormat, ContentType},
    frame::{ColumnSpec, Frame},
    query::{execute, ParserKind, QueryRequest},
};

const EMPLOYEES: &str = "\
id,name,age,salary,skills
1,Alice,30,\"75,000\",rust;sql
2,Bob,25,65000,python
3,Charlie,35,85000,rust;go;sql
4,Diana,28,70000,sql
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Raw rows, columns derived from the header
    let request = QueryRequest::new(ContentType::Csv, ParserKind::Simple);
    let response = execute(&request, EMPLOYEES.into())?;
    println!("Original dataset:");
    if let Some(frame) = response.table() {
        print_frame(frame);
    }

    // Filter, compute and project with a pipeline
    let request = QueryRequest::new(ContentType::Csv, ParserKind::Uql)
        .with_uql(
            "parse-csv \
             | where age > 25 \
             | extend bonus=mul(salary, 0.05), skills=split(skills, ';') \
             | mv-expand skills \
             | summarize people=dcount(name), payroll=sum(salary) by skills \
             | order by payroll desc",
        )
        .with_columns(vec![
            ColumnSpec::new("skills", "skill", ColumnFormat::String),
            ColumnSpec::new("people", "", ColumnFormat::Number),
            ColumnSpec::new("payroll", "", ColumnFormat::Number),
        ]);
    let response = execute(&request, EMPLOYEES.into())?;

    println!("\nPayroll by skill:");
    if let Some(frame) = response.table() {
        print_frame(frame);
    }
    for warning in &response.warnings {
        println!("warning: {}", warning);
    }

    Ok(())
}

// Helper function to print a frame
fn print_frame(frame: &Frame) {
    let header: Vec<&str> = frame.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join(" | "));
    println!("{}", vec!["----"; header.len()].join("-+-"));

    for row in &frame.rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .map(|cell| match cell {
                Cell::Null => "NULL".to_string(),
                Cell::String(s) => s.clone(),
                Cell::Number(n) => format!("{:.1}", n),
                Cell::Timestamp(ts) => ts.to_rfc3339(),
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
}
