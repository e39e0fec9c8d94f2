//! Read, write and verify commands
//!
//! Transfers go through the handle in small chunks so the progress bar moves
//! and so an interrupted write leaves whole chunks behind. Writes skip chunks
//! whose contents already match, which saves a programming cycle per word.

use indicatif::{ProgressBar, ProgressStyle};
use plxeeprom_device::EepromHandle;
use std::fs;
use std::path::Path;

/// Bytes per transfer
const CHUNK_SIZE: usize = 32;

fn create_progress_bar(total: u64, phase: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Check that `len` bytes at `offset` fit in the EEPROM
fn check_range(
    handle: &EepromHandle,
    offset: usize,
    len: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let capacity = handle.capacity();
    if offset > capacity || len > capacity - offset {
        return Err(format!(
            "range {:#x}+{:#x} exceeds EEPROM size of {} bytes",
            offset, len, capacity
        )
        .into());
    }
    Ok(())
}

/// Read `len` bytes starting at `offset`
fn read_range(
    handle: &EepromHandle,
    offset: usize,
    len: usize,
    pb: &ProgressBar,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; len];
    for (i, chunk) in data.chunks_mut(CHUNK_SIZE).enumerate() {
        let pos = offset + i * CHUNK_SIZE;
        let n = handle.read_at(pos, chunk)?;
        if n != chunk.len() {
            return Err(format!("short read at {:#x}: {} of {} bytes", pos, n, chunk.len()).into());
        }
        pb.inc(n as u64);
    }
    Ok(data)
}

/// Find the first byte where two images differ
fn first_mismatch(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected.iter().zip(actual).position(|(a, b)| a != b)
}

/// Read EEPROM contents to a file
pub fn run_read(
    handle: &EepromHandle,
    output: &Path,
    offset: usize,
    length: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let capacity = handle.capacity();
    let len = length.unwrap_or(capacity.saturating_sub(offset));
    check_range(handle, offset, len)?;

    let pb = create_progress_bar(len as u64, "Reading")?;
    let data = read_range(handle, offset, len, &pb)?;
    pb.finish_with_message("Read complete");

    fs::write(output, &data)?;
    println!("Read {} bytes to {}", data.len(), output.display());
    Ok(())
}

/// Write a file to the EEPROM
pub fn run_write(
    handle: &EepromHandle,
    input: &Path,
    offset: usize,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    if data.is_empty() {
        return Err(format!("{} is empty", input.display()).into());
    }
    check_range(handle, offset, data.len())?;

    log::info!("Reading current contents...");
    let pb = create_progress_bar(data.len() as u64, "Reading")?;
    let current = read_range(handle, offset, data.len(), &pb)?;
    pb.finish_and_clear();

    let pb = create_progress_bar(data.len() as u64, "Writing")?;
    let mut written = 0usize;
    for (i, (new, old)) in data
        .chunks(CHUNK_SIZE)
        .zip(current.chunks(CHUNK_SIZE))
        .enumerate()
    {
        if new != old {
            let pos = offset + i * CHUNK_SIZE;
            let n = handle.write_at(pos, new)?;
            if n != new.len() {
                pb.abandon();
                return Err(format!(
                    "write stopped at {:#x}: {} of {} bytes programmed",
                    pos,
                    n,
                    new.len()
                )
                .into());
            }
            written += n;
        }
        pb.inc(new.len() as u64);
    }
    pb.finish_with_message("Write complete");

    if written == 0 {
        println!("EEPROM already contains {}", input.display());
    } else {
        println!("Wrote {} of {} bytes", written, data.len());
    }

    if verify {
        verify_image(handle, &data, offset)?;
    }
    Ok(())
}

/// Compare the EEPROM against a file
pub fn run_verify(
    handle: &EepromHandle,
    input: &Path,
    offset: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    check_range(handle, offset, data.len())?;
    verify_image(handle, &data, offset)
}

fn verify_image(
    handle: &EepromHandle,
    expected: &[u8],
    offset: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = create_progress_bar(expected.len() as u64, "Verifying")?;
    let actual = read_range(handle, offset, expected.len(), &pb)?;
    pb.finish_and_clear();

    if let Some(i) = first_mismatch(expected, &actual) {
        return Err(format!(
            "verification failed at {:#x}: expected {:02x}, found {:02x}",
            offset + i,
            expected[i],
            actual[i]
        )
        .into());
    }
    println!("Verified {} bytes", expected.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mismatch() {
        assert_eq!(first_mismatch(&[1, 2, 3], &[1, 2, 3]), None);
        assert_eq!(first_mismatch(&[1, 2, 3], &[1, 9, 3]), Some(1));
    }

    #[cfg(feature = "dummy")]
    mod dummy {
        use super::super::*;
        use plxeeprom_device::{open_device, DetectOptions};
        use std::path::PathBuf;

        fn temp_file(name: &str) -> PathBuf {
            std::env::temp_dir().join(format!("plxeeprom-{}-{}", std::process::id(), name))
        }

        fn open(spec: &str) -> EepromHandle {
            open_device(spec, &DetectOptions::new()).unwrap().0
        }

        #[test]
        fn test_write_then_read_file() {
            let handle = open("dummy:model=9054");
            let input = temp_file("write.bin");
            let output = temp_file("read.bin");
            let image: Vec<u8> = (0..100u8).collect();
            fs::write(&input, &image).unwrap();

            run_write(&handle, &input, 3, true).unwrap();
            run_read(&handle, &output, 3, Some(image.len())).unwrap();
            assert_eq!(fs::read(&output).unwrap(), image);

            run_verify(&handle, &input, 3).unwrap();
            assert!(run_verify(&handle, &input, 4).is_err());

            fs::remove_file(input).ok();
            fs::remove_file(output).ok();
        }

        #[test]
        fn test_read_whole_device() {
            let handle = open("dummy:model=9050,fill=0x5a");
            let output = temp_file("dump.bin");
            run_read(&handle, &output, 0, None).unwrap();
            assert_eq!(fs::read(&output).unwrap(), vec![0x5a; 128]);
            fs::remove_file(output).ok();
        }

        #[test]
        fn test_oversized_image_rejected() {
            let handle = open("dummy:model=9050");
            let input = temp_file("big.bin");
            fs::write(&input, vec![0u8; 129]).unwrap();
            assert!(run_write(&handle, &input, 0, false).is_err());
            fs::remove_file(input).ok();
        }

        #[test]
        fn test_stuck_part_reports_failure() {
            let handle = open("dummy:model=9050,fill=0,fault=never-ready");
            let input = temp_file("stuck.bin");
            fs::write(&input, [1u8, 2, 3, 4]).unwrap();
            assert!(run_write(&handle, &input, 0, false).is_err());
            fs::remove_file(input).ok();
        }
    }
}
