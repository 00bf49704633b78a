use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Steady)?;
    record_profile(TranscriptProfile::Spiky)?;
    record_profile(TranscriptProfile::Stuck)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    match profile {
        TranscriptProfile::Steady => record_steady(&mut session),
        TranscriptProfile::Spiky => record_spiky(&mut session),
        TranscriptProfile::Stuck => record_stuck(&mut session),
    }
}

fn record_steady(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("sample 3")?;
    let _ = session.handle_command("script 0,0,0,0,4095,2000,2000,2000,2000")?;
    let _ = session.handle_command("sample")?;
    let _ = session.handle_command("level 100")?;
    let _ = session.handle_command("sample")?;
    let _ = session.handle_command("status")?;
    Ok(())
}

fn record_spiky(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("sample 5")?;
    let _ = session.handle_command("noise 40")?;
    let _ = session.handle_command("sample 5")?;
    let _ = session.handle_command("status")?;
    Ok(())
}

fn record_stuck(session: &mut Session) -> io::Result<()> {
    let _ = session.handle_command("sample")?;
    let _ = session.handle_command("stall off")?;
    let _ = session.handle_command("stall 1")?;
    let _ = session.handle_command("sample")?;
    let _ = session.handle_command("status")?;
    Ok(())
}
