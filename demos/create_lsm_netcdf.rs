//! Creates sample land surface model output for trying out pangaea.
//!
//! Writes three hourly files with WRF-style 3-D `XLAT`/`XLONG` coordinates
//! and `Times` timestamps into `lsm_demo/`.

use ndarray::Array3;
use netcdf::create;
use netcdf::types::{NcTypeDescriptor, NcVariableType};
use std::path::Path;

const NY: usize = 4;
const NX: usize = 5;
const DATE_STR_LEN: usize = 19;

#[repr(transparent)]
#[derive(Clone, Copy)]
struct NcChar(u8);

unsafe impl NcTypeDescriptor for NcChar {
    fn type_descriptor() -> NcVariableType {
        NcVariableType::Char
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = Path::new("lsm_demo");
    std::fs::create_dir_all(out_dir)?;

    for hour in 0..3 {
        let output_path = out_dir.join(format!("lsm_{:02}.nc", hour));
        if output_path.exists() {
            std::fs::remove_file(&output_path)?;
        }

        let mut file = create(&output_path)?;
        file.add_attribute("title", "pangaea demo LSM output")?;

        file.add_dimension("Time", 1)?;
        file.add_dimension("DateStrLen", DATE_STR_LEN)?;
        file.add_dimension("south_north", NY)?;
        file.add_dimension("west_east", NX)?;

        {
            let stamp = format!("2017-06-01_{:02}:00:00", hour);
            let chars: Vec<NcChar> = stamp.bytes().map(NcChar).collect();
            let mut times = file.add_variable::<NcChar>("Times", &["Time", "DateStrLen"])?;
            times.put_values(&chars, ..)?;
        }

        {
            let lat = Array3::from_shape_fn((1, NY, NX), |(_, j, _)| 40.0 + j as f64 * 0.25);
            let mut xlat = file.add_variable::<f32>("XLAT", &["Time", "south_north", "west_east"])?;
            xlat.put_attribute("units", "degrees_north")?;
            xlat.put(lat.mapv(|v| v as f32).view(), ..)?;
        }

        {
            let lon = Array3::from_shape_fn((1, NY, NX), |(_, _, i)| -105.0 + i as f64 * 0.25);
            let mut xlong = file.add_variable::<f32>("XLONG", &["Time", "south_north", "west_east"])?;
            xlong.put_attribute("units", "degrees_east")?;
            xlong.put(lon.mapv(|v| v as f32).view(), ..)?;
        }

        {
            let rain = Array3::from_shape_fn((1, NY, NX), |(_, j, i)| {
                (hour as f32) * 0.1 + (j * NX + i) as f32 * 0.01
            });
            let mut rainrate =
                file.add_variable::<f32>("RAINRATE", &["Time", "south_north", "west_east"])?;
            rainrate.put_attribute("units", "mm s-1")?;
            rainrate.put_attribute("_FillValue", -9999.0f32)?;
            rainrate.put(rain.view(), ..)?;
        }

        println!("✅ Created {}", output_path.display());
    }

    println!("\n🧪 Open them with:");
    println!(
        "   cargo run -- -f 'lsm_demo/*.nc' --lat-var XLAT --lon-var XLONG --time-var Times \\"
    );
    println!("       --lat-dim south_north --lon-dim west_east --time-dim Time");

    Ok(())
}
