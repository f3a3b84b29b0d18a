use std::path::Path;

/// First kernel release that provides `/proc/self/mountstats`.
const MIN_KERNEL: (u32, u32, u32) = (2, 6, 17);

/// Parses the leading `major.minor.patch` of a kernel release string such as
/// `6.8.0-45-generic`. Missing components count as `0`.
pub fn parse_kernel_release(release: &str) -> Option<(u32, u32, u32)> {
    let mut parts = release.trim().split(['.', '-', '+', '_']);
    let major = leading_number(parts.next()?)?;
    let minor = parts.next().and_then(leading_number).unwrap_or(0);
    let patch = parts.next().and_then(leading_number).unwrap_or(0);
    Some((major, minor, patch))
}

fn leading_number(part: &str) -> Option<u32> {
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part[..end].parse().ok()
}

/// Returns `true` if a kernel of this version is expected to expose the report.
pub fn kernel_supports_mountstats(version: (u32, u32, u32)) -> bool {
    version >= MIN_KERNEL
}

/// Checks once whether the mountstats report can be opened.
///
/// If it cannot, the kernel release is consulted to tell an expected absence
/// (old kernel) from a suspicious one, and the result is logged.
///
/// # Arguments
///
/// * `report` - Path of the mountstats report.
/// * `osrelease` - Path of a file holding the kernel release string.
pub fn probe(report: &Path, osrelease: &Path) -> bool {
    match std::fs::File::open(report) {
        Ok(_) => {
            log::info!("Statistics through `{}` are available", report.display());
            true
        }
        Err(err) => {
            log::info!("Could not open `{}` ({err}), checking why", report.display());
            match std::fs::read_to_string(osrelease) {
                Ok(release) => match parse_kernel_release(&release) {
                    Some(version) if kernel_supports_mountstats(version) => log::warn!(
                        "Could not open `{}`. Kernel {} should support it (since 2.6.17)",
                        report.display(),
                        release.trim()
                    ),
                    Some(_) => {}
                    None => log::warn!(
                        "Could not open `{}` and kernel version could not be parsed (`{}`)",
                        report.display(),
                        release.trim()
                    ),
                },
                Err(err) => log::warn!(
                    "Could not open `{}` and kernel release is unavailable: {err}",
                    report.display()
                ),
            }
            log::info!(
                "Statistics through `{}` are unavailable. This is normal if no other message appears",
                report.display()
            );
            false
        }
    }
}
