use serde::Serialize;
use serde_json::json;

/// Print `data` inside the success envelope
pub fn output_data<T: Serialize>(data: &T) -> anyhow::Result<()> {
    let response = json!({
        "success": true,
        "data": data
    });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub fn output_lines<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        println!("{}", line.as_ref());
    }
}
