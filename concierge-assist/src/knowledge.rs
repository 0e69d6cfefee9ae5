//! Airline reference knowledge for the language model: policies, passenger
//! services and a per-hub guide to terminals, trains and lounges.

use std::fmt::Write;
use std::sync::LazyLock;

use concierge_core::airports::known_cities;

pub struct Fact {
    pub topic: &'static str,
    pub detail: &'static str,
}

pub struct TerminalGuide {
    pub name: &'static str,
    pub gates: &'static str,
    pub notes: &'static str,
}

pub struct AirportGuide {
    pub code: &'static str,
    pub name: &'static str,
    pub layout: &'static str,
    pub terminals: &'static [TerminalGuide],
    /// Free train between terminals, when the airport has one.
    pub transit: Option<&'static str>,
    pub admirals_clubs: &'static str,
    pub tips: &'static [&'static str],
}

const fn fact(topic: &'static str, detail: &'static str) -> Fact {
    Fact { topic, detail }
}

const fn terminal(name: &'static str, gates: &'static str, notes: &'static str) -> TerminalGuide {
    TerminalGuide { name, gates, notes }
}

pub const POLICIES: &[Fact] = &[
    fact("Check-in", "Opens 24 hours before departure online or at the airport"),
    fact("Baggage", "First checked bag fees apply and vary by route and fare type"),
    fact("Seating", "Seats can be chosen at booking or at check-in"),
    fact("Changes", "Flight changes are allowed; fees depend on the fare type"),
    fact("Cancellations", "Refundable fares are refunded; non-refundable fares become travel credit"),
    fact("Standby", "Same-day standby is available to AAdvantage members"),
    fact("Boarding", "Groups 1 to 9, ordered by status and fare class"),
];

pub const SERVICES: &[Fact] = &[
    fact("Wheelchair assistance", "Free on request; ask at booking or at least 48 hours before, or at check-in or the gate"),
    fact("Unaccompanied minors", "Available for children 5 to 14 years old"),
    fact("Special meals", "Request at least 24 hours before departure"),
    fact("Priority boarding", "For AAdvantage elite members and premium cabin passengers"),
    fact("Admirals Club", "Airport lounges for members and premium passengers"),
];

pub const FLIGHT_FACTS: &[Fact] = &[
    fact("Flight numbers", "AA followed by 1 to 4 digits, e.g. AA100 or AA1234"),
    fact("Confirmation codes", "6 or 7 letters and digits, e.g. DEMO123; may be spelled out letter by letter"),
    fact("Seats", "Window is usually A or F, aisle C or D, middle B or E"),
    fact("Boarding", "Starts 30 to 45 minutes before departure; doors close 10 to 15 minutes before"),
    fact("Arrival", "Arrive 2 hours early for domestic and 3 hours for international flights, plus 30 to 60 minutes at peak times"),
    fact("Gates", "Gates can change; check the departure boards before walking to the gate"),
];

/// Walking guidance at an unhurried pace of about 50 meters a minute.
pub const NAVIGATION_TIPS: &[&str] = &[
    "Adjacent gates are 2 to 3 minutes apart; a whole concourse takes 8 to 12 minutes",
    "Changing terminals by train takes 2 to 3 minutes plus a short walk; walking takes 10 to 20 minutes",
    "Lower gate numbers are usually closer to security",
    "Restrooms are every 4 to 6 gates and information desks sit near security, marked with an \"i\"",
    "Airport trains are free, run every 2 to 3 minutes and are wheelchair accessible",
];

pub const AIRPORTS: &[AirportGuide] = &[
    AirportGuide {
        code: "DFW",
        name: "Dallas/Fort Worth International",
        layout: "Five terminals (A to E) in a horseshoe",
        terminals: &[
            terminal("Terminal A", "A1-A38", "Mostly regional flights; blue signs; 5-7 minutes end to end"),
            terminal("Terminal B", "B1-B49", "Main domestic hub; green signs; B1-B10 near security, B40-B49 at the far end"),
            terminal("Terminal C", "C1-C39", "Domestic and international; yellow signs; food court"),
            terminal("Terminal D", "D1-D40", "International arrivals with customs on the lower level; red signs; duty free"),
            terminal("Terminal E", "E1-E31", "International departures; purple signs"),
        ],
        transit: Some("Skylink train links all five terminals, runs 24/7, 2-3 minutes between terminals"),
        admirals_clubs: "A24, B4, B24, C20, D6, D22, E12 (Level 3)",
        tips: &["Always take Skylink to change terminals", "Wheelchair help is available 24/7 at check-in or the gate"],
    },
    AirportGuide {
        code: "ORD",
        name: "Chicago O'Hare International",
        layout: "Terminals 1, 2, 3 and 5; American flies mainly from Terminal 3",
        terminals: &[
            terminal("Terminal 2", "E1-E11, F1-F20", "Mixed airlines, some American flights"),
            terminal("Terminal 3", "G1-G21, H1-H32, K1-K20, L1-L20", "Main American terminal; H1-H15 are central; 10-12 minutes end to end"),
            terminal("Terminal 5", "International gates", "Some American international flights; customs on the lower level"),
        ],
        transit: Some("ATS train links Terminals 1, 2 and 3; Terminal 5 needs a shuttle"),
        admirals_clubs: "Terminal 3, Concourse H near H6 (Level 2)",
        tips: &["Terminal 3 is large, allow extra time", "Use the moving walkways"],
    },
    AirportGuide {
        code: "MIA",
        name: "Miami International",
        layout: "North Terminal (Concourse D) and Central Terminal (Concourse E)",
        terminals: &[
            terminal("Concourse D", "D1-D60", "Main American area; D1-D20 near security; 12-15 minutes end to end"),
            terminal("Concourse E", "E1-E40", "American and partner airlines"),
        ],
        transit: None,
        admirals_clubs: "D15, D30, E11 (Level 3)",
        tips: &["Moving walkways connect D and E in 5-7 minutes"],
    },
    AirportGuide {
        code: "LAX",
        name: "Los Angeles International",
        layout: "American uses Terminals 4 and 5",
        terminals: &[
            terminal("Terminal 4", "40-59", "Main American terminal; 6-8 minutes end to end"),
            terminal("Terminal 5", "50-69", "American and partner flights, connected to Terminal 4 by walkway"),
        ],
        transit: None,
        admirals_clubs: "Terminal 4 near Gate 44 (Level 5)",
        tips: &["Walking between Terminals 4 and 5 takes 3-5 minutes"],
    },
    AirportGuide {
        code: "CLT",
        name: "Charlotte Douglas International",
        layout: "One terminal with Concourses A to E around a central atrium",
        terminals: &[
            terminal("Concourse A", "A1-A36", "Regional and some mainline flights"),
            terminal("Concourse B", "B1-B36", "Mainline; food court"),
            terminal("Concourse C", "C1-C36", "Mainline"),
            terminal("Concourse D", "D1-D36", "Mainline and international"),
            terminal("Concourse E", "E1-E36", "Regional"),
        ],
        transit: None,
        admirals_clubs: "B8, C4, D8 (Level 2)",
        tips: &["Adjacent concourses are 3-5 minutes apart through the atrium"],
    },
    AirportGuide {
        code: "PHL",
        name: "Philadelphia International",
        layout: "Terminals A-East, A-West and B to F",
        terminals: &[
            terminal("Terminal A-West", "A14-A26", "Main American terminal; 4-5 minutes end to end"),
            terminal("Terminal A-East", "A1-A13", "American regional flights, connected to A-West"),
        ],
        transit: None,
        admirals_clubs: "A-West near A15 (Level 2)",
        tips: &["A-West to A-East is a 2-3 minute walk"],
    },
    AirportGuide {
        code: "PHX",
        name: "Phoenix Sky Harbor",
        layout: "Terminals 3 and 4; American flies mainly from Terminal 4",
        terminals: &[
            terminal("Terminal 3", "1-20", "Some American flights"),
            terminal("Terminal 4", "A1-A20, B1-B28, C1-C20", "Main American hub; Concourse B is largest, B1-B14 central"),
        ],
        transit: Some("Sky Train links Terminals 3 and 4 in about 2 minutes, runs 24/7"),
        admirals_clubs: "A7, B7 (Level 2)",
        tips: &["Walking between terminals takes 10-15 minutes; take the Sky Train"],
    },
];

/// Hub guide for an airport code.
pub fn airport_guide(code: &str) -> Option<&'static AirportGuide> {
    AIRPORTS.iter().find(|a| a.code.eq_ignore_ascii_case(code))
}

fn write_facts(out: &mut String, title: &str, facts: &[Fact]) {
    let _ = writeln!(out, "{}:", title);
    for f in facts {
        let _ = writeln!(out, "- {}: {}", f.topic, f.detail);
    }
    out.push('\n');
}

fn write_airport(out: &mut String, airport: &AirportGuide) {
    let _ = writeln!(out, "{} ({}): {}", airport.name, airport.code, airport.layout);
    for t in airport.terminals {
        let _ = writeln!(out, "- {} gates {}: {}", t.name, t.gates, t.notes);
    }
    if let Some(transit) = airport.transit {
        let _ = writeln!(out, "- Train: {}", transit);
    }
    let _ = writeln!(out, "- Admirals Club: {}", airport.admirals_clubs);
    for tip in airport.tips {
        let _ = writeln!(out, "- Tip: {}", tip);
    }
    out.push('\n');
}

static KNOWLEDGE: LazyLock<String> = LazyLock::new(|| {
    let mut out = String::from(
        "AMERICAN AIRLINES: founded 1926, headquartered in Fort Worth, Texas. \
         Hubs: DFW, CLT, ORD, MIA, LAX, PHL, PHX. AAdvantage is the frequent flyer program.\n\n",
    );
    write_facts(&mut out, "POLICIES", POLICIES);
    write_facts(&mut out, "SERVICES", SERVICES);
    write_facts(&mut out, "FLIGHTS", FLIGHT_FACTS);

    out.push_str("AIRPORTS:\n");
    for airport in AIRPORTS {
        write_airport(&mut out, airport);
    }
    out.push_str("GETTING AROUND:\n");
    for tip in NAVIGATION_TIPS {
        let _ = writeln!(out, "- {}", tip);
    }

    let cities: Vec<String> = known_cities().map(|(code, city)| format!("{} = {}", city, code)).collect();
    let _ = write!(out, "\nCITY CODES: {}", cities.join(", "));
    out
});

/// The whole knowledge base as prompt text. Built once.
pub fn knowledge_context() -> &'static str {
    &KNOWLEDGE
}

const AGENT_PERSONA: &str = r#"You are "AA Assistant", a friendly American Airlines travel assistant helping elderly passengers book and manage their flights.

Speak the passenger's language: answer entirely in Spanish (formal "usted") when they speak Spanish, otherwise in English.
Be patient, warm and brief. Ask one question at a time, confirm before changing anything, and read back dates, times and flight numbers.
Use 12-hour times with AM/PM and spell out months. Passengers may spell codes letter by letter.
When answering airport questions, name the terminal and gate, give step-by-step directions and mention nearby amenities."#;

const TOOL_RULES: &str = r#"TOOL RULES:
1. Always read the tool result back to the passenger; never stay silent after a tool call.
2. When a result has "spoken_response" or "spoken_summary", say exactly that.
3. When a result has "needs", ask for the first missing item only, then call the tool again.
4. For new bookings ask origin, destination and date, present the options, then ask for first and last name.
5. Spell the confirmation code letter by letter when confirming a booking.
6. Afterwards, ask whether there is anything else you can help with."#;

/// System prompt for a hosted voice agent that calls back into our tools.
pub fn voice_agent_prompt(tools: &[&str]) -> String {
    let mut out = format!("{}\n\nKNOWLEDGE BASE:\n{}\n\n", AGENT_PERSONA, knowledge_context());
    out.push_str("AVAILABLE TOOLS:\n");
    for tool in tools {
        let _ = writeln!(out, "- {}", tool);
    }
    out.push('\n');
    out.push_str(TOOL_RULES);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airport_guide_lookup() {
        let dfw = airport_guide("dfw").unwrap();
        assert_eq!(dfw.terminals.len(), 5);
        assert!(dfw.transit.unwrap().starts_with("Skylink"));
        assert!(airport_guide("MIA").unwrap().transit.is_none());
        assert!(airport_guide("XYZ").is_none());
    }

    #[test]
    fn test_context_covers_policies_and_hubs() {
        let text = knowledge_context();
        assert!(text.contains("- Wheelchair assistance: Free on request"));
        assert!(text.contains("- Baggage: First checked bag fees apply"));
        for airport in AIRPORTS {
            assert!(text.contains(&format!("({})", airport.code)), "missing {}", airport.code);
        }
        assert!(text.contains("Chicago = ORD"));
    }

    #[test]
    fn test_voice_agent_prompt_lists_tools() {
        let prompt = voice_agent_prompt(&["lookup_reservation", "change_flight"]);
        assert!(prompt.starts_with("You are \"AA Assistant\""));
        assert!(prompt.contains("- lookup_reservation\n- change_flight\n"));
        assert!(prompt.contains("Sky Train"));
        assert!(prompt.ends_with("anything else you can help with."));
    }
}
