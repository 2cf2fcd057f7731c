//! Built-in question bank content. Guarantees every domain can run a full
//! assessment (including one escalation to advanced) without config or AI.

use crate::domain::{CodeSnippet, Domain, Question, ScenarioQuestion, StandardQuestion, Tier};

fn standard(id: &str, domain: Domain, difficulty: Tier, question: &str, options: [&str; 4], correct: usize, explanation: &str) -> Question {
  Question::Standard(StandardQuestion {
    id: id.into(),
    domain,
    difficulty,
    question: question.into(),
    options: options.iter().map(|o| o.to_string()).collect(),
    correct,
    explanation: explanation.into(),
    sources: Vec::new(),
    ai_generated: false,
    generated_at: None,
  })
}

struct ScenarioSeed<'a> {
  id: &'a str,
  domain: Domain,
  difficulty: Tier,
  title: &'a str,
  context: &'a str,
  diagram: Option<&'a str>,
  code: Option<(&'a str, &'a str)>,
  question: &'a str,
  options: [&'a str; 4],
  correct: usize,
  explanation: &'a str,
  learning_points: &'a [&'a str],
}

fn scenario(s: ScenarioSeed<'_>) -> Question {
  Question::Scenario(ScenarioQuestion {
    id: s.id.into(),
    domain: s.domain,
    difficulty: s.difficulty,
    title: s.title.into(),
    context: s.context.into(),
    diagram: s.diagram.map(str::to_string),
    code_snippet: s.code.map(|(language, code)| CodeSnippet { language: language.into(), code: code.into() }),
    question: s.question.into(),
    options: s.options.iter().map(|o| o.to_string()).collect(),
    correct: s.correct,
    explanation: s.explanation.into(),
    learning_points: s.learning_points.iter().map(|p| p.to_string()).collect(),
    sources: Vec::new(),
    ai_generated: false,
    generated_at: None,
  })
}

/// Fixed-order standard questions. Order within a (domain, tier) is significant:
/// sessions always take the first entries.
pub fn seed_questions() -> Vec<Question> {
  use Domain::*;
  use Tier::*;
  vec![
    // network-security
    standard("ns1", NetworkSecurity, Beginner, "What does a firewall primarily do?",
      ["Blocks all internet traffic", "Filters network traffic based on security rules", "Encrypts all data on a network", "Monitors user passwords"], 1,
      "A firewall filters incoming and outgoing network traffic based on predetermined security rules, acting as a barrier between trusted and untrusted networks."),
    standard("ns2", NetworkSecurity, Beginner, "Which protocol is used to securely access a remote server?",
      ["FTP", "HTTP", "SSH", "SMTP"], 2,
      "SSH (Secure Shell) provides encrypted communication for remote server access, protecting credentials and data in transit."),
    standard("ns3", NetworkSecurity, Intermediate, "In a DDoS attack, what is the primary goal of the attacker?",
      ["Steal sensitive data from the server", "Overwhelm system resources to make services unavailable", "Install malware on user devices", "Bypass authentication systems"], 1,
      "DDoS attacks aim to overwhelm a system with traffic from multiple sources, making legitimate services unavailable to users."),
    standard("ns4", NetworkSecurity, Intermediate, "What is the purpose of network segmentation?",
      ["To increase internet speed", "To isolate different parts of a network and limit breach impact", "To reduce hardware costs", "To simplify network configuration"], 1,
      "Network segmentation divides a network into smaller segments to contain breaches, reduce attack surface and improve overall security posture."),
    standard("ns5", NetworkSecurity, Advanced, "Which technique would best detect a zero-day exploit in network traffic?",
      ["Signature-based IDS only", "Behavioral analysis and anomaly detection", "Static firewall rules", "Regular password rotation"], 1,
      "Behavioral analysis and anomaly detection can flag unusual patterns left by zero-day exploits, which have no known signatures."),
    // secure-coding
    standard("sc1", SecureCoding, Beginner, "What is SQL injection?",
      ["A method to optimize database queries", "An attack that inserts malicious SQL code into application queries", "A database backup technique", "A way to encrypt SQL databases"], 1,
      "SQL injection inserts malicious SQL statements into application queries, potentially letting attackers view, modify or delete data."),
    standard("sc2", SecureCoding, Beginner, "Why should user passwords be hashed rather than encrypted?",
      ["Hashing is faster than encryption", "Hashed passwords are easier to recover", "Hashing is one-way, preventing password recovery even if data is breached", "Encryption is not supported by modern databases"], 2,
      "Hashing is one-way: even if the database is compromised the original passwords cannot be recovered."),
    standard("sc3", SecureCoding, Intermediate, "What is the OWASP Top 10?",
      ["A list of the ten best security tools", "The ten most critical web application security risks", "Ten programming languages ranked by security", "A certification program for developers"], 1,
      "The OWASP Top 10 is a regularly updated list of the most critical web application security risks and a baseline for secure development."),
    standard("sc4", SecureCoding, Intermediate, "What does input validation primarily prevent?",
      ["Performance issues", "Code injection attacks and malformed data processing", "User interface errors", "Database connection failures"], 1,
      "Input validation keeps malformed data out of the system, preventing injection attacks, buffer overflows and similar exploitation."),
    standard("sc5", SecureCoding, Advanced, "In secure coding, what is the principle of \"defense in depth\"?",
      ["Writing extensive code documentation", "Implementing multiple layers of security controls", "Using only the most secure programming language", "Focusing exclusively on perimeter security"], 1,
      "Defense in depth layers several independent controls so that the failure of one still leaves others protecting the application."),
    // incident-response
    standard("ir1", IncidentResponse, Beginner, "What is the first step in incident response?",
      ["Delete all suspicious files", "Identification and detection of the incident", "Restore from backup immediately", "Notify the media"], 1,
      "Identifying and detecting that an incident has occurred is what triggers the whole response process."),
    standard("ir2", IncidentResponse, Beginner, "Why is evidence preservation important in incident response?",
      ["It speeds up system recovery", "It enables forensic analysis and potential legal action", "It reduces storage costs", "It prevents future attacks automatically"], 1,
      "Preserved evidence keeps its integrity for forensic investigation, legal proceedings and compliance."),
    standard("ir3", IncidentResponse, Intermediate, "What does \"containment\" mean in incident response?",
      ["Deleting all affected systems", "Limiting the scope and impact of an incident", "Notifying all stakeholders immediately", "Creating backup copies of data"], 1,
      "Containment limits the spread and impact of an incident while preserving evidence and keeping the business running where possible."),
    standard("ir4", IncidentResponse, Intermediate, "What is a runbook in incident response?",
      ["A financial report of incident costs", "A predefined procedure for handling specific incident types", "A tool for running automated scans", "A log of all security incidents"], 1,
      "A runbook gives step-by-step procedures for specific incident types so responses are consistent and effective."),
    standard("ir5", IncidentResponse, Advanced, "In a sophisticated APT attack, what is the most critical factor in detection?",
      ["Having the latest antivirus software", "Monitoring for anomalous behavior over time", "Strong password policies", "Regular system updates"], 1,
      "APTs are stealthy and long-lived; detecting them needs continuous behavioral monitoring and correlation of indicators over time."),
  ]
}

pub fn seed_scenarios() -> Vec<Question> {
  use Domain::*;
  use Tier::*;
  vec![
    scenario(ScenarioSeed {
      id: "ns-scenario-1", domain: NetworkSecurity, difficulty: Intermediate,
      title: "Unusual Network Traffic Detected",
      context: "At 3:00 AM your IDS alerts on unusual outbound traffic: several finance workstations have sent 2.5 GB over the past hour to an unfamiliar IP address abroad, on port 443, as a steady stream outside business hours.",
      diagram: Some("Finance 10.0.2.x/24 --2.5GB--> Firewall/IDS (ALERT) --:443--> 185.x.x.x"),
      code: None,
      question: "What is the MOST appropriate immediate action?",
      options: [
        "Immediately shut down the entire company network to stop the data leak",
        "Block the external IP at the firewall and isolate affected workstations for forensic analysis",
        "Email all finance employees asking if they are working late",
        "Wait until morning to investigate as it might be scheduled backup traffic",
      ],
      correct: 1,
      explanation: "✓ Blocking and isolating stops the exfiltration, preserves evidence and contains the incident without halting the business. ✗ A full shutdown is needlessly disruptive, alerting staff may tip off attackers, and waiting allows more data loss.",
      learning_points: &[
        "Data exfiltration often happens during off-hours",
        "Block and isolate is better than complete shutdown",
        "Preserve evidence before alerting potential attackers",
        "Port 443 abuse is common to hide malicious traffic",
      ],
    }),
    scenario(ScenarioSeed {
      id: "ns-scenario-2", domain: NetworkSecurity, difficulty: Advanced,
      title: "Zero-Day Exploit Analysis",
      context: "A critical (9.8) remote code execution flaw with public exploit code affects your web server version. The vendor patch is two weeks away and the server handles online banking at roughly $50,000 of revenue per hour.",
      diagram: None,
      code: None,
      question: "What is the BEST risk mitigation strategy while waiting for the vendor patch?",
      options: [
        "Take the server offline until the official patch is released",
        "Deploy a WAF with custom rules for known exploit patterns, enable enhanced monitoring and prepare a rollback plan",
        "Continue normal operations and rely on antivirus to detect exploitation",
        "Switch to the beta version of the software which reportedly fixes the issue",
      ],
      correct: 1,
      explanation: "✓ A WAF with targeted rules plus enhanced monitoring blocks known exploit patterns while keeping the business running. ✗ Going offline is very costly, antivirus does not stop web exploitation and untested beta software may add new flaws.",
      learning_points: &[
        "Balance security risk against business impact",
        "WAF provides temporary protection for web vulnerabilities",
        "Never deploy untested patches or beta software in production",
        "Defense-in-depth means multiple protective layers",
      ],
    }),
    scenario(ScenarioSeed {
      id: "sc-scenario-1", domain: SecureCoding, difficulty: Intermediate,
      title: "SQL Injection Vulnerability Review",
      context: "You are reviewing a pull request from a junior developer who wrote a login function that checks credentials against the database.",
      diagram: None,
      code: Some(("python", "def login_user(username, password):\n    cursor = get_database_connection().cursor()\n    query = \"SELECT * FROM users WHERE username = '\" + username + \"' AND password = '\" + password + \"'\"\n    cursor.execute(query)\n    return cursor.fetchone() is not None")),
      question: "What is the PRIMARY security vulnerability in this code?",
      options: [
        "The function does not use HTTPS for data transmission",
        "User input is concatenated directly into the SQL query, enabling SQL injection",
        "The password is not hashed before comparison",
        "The function does not rate-limit login attempts",
      ],
      correct: 1,
      explanation: "✓ Input like `admin' --` comments out the password check and logs in without a password; use parameterized queries. ✗ Hashing and rate limiting matter but are less severe, and HTTPS is a transport concern rather than a code flaw.",
      learning_points: &[
        "Never concatenate user input into SQL queries",
        "Always use parameterized queries or prepared statements",
        "SQL injection can bypass all authentication",
        "Input validation is not enough, use proper query methods",
      ],
    }),
    scenario(ScenarioSeed {
      id: "sc-scenario-2", domain: SecureCoding, difficulty: Advanced,
      title: "Race Condition in Payment Processing",
      context: "A customer was charged twice for a single shipped item. The payment code reads the balance, checks it, then writes the new balance and creates the order in separate awaits.",
      diagram: None,
      code: Some(("javascript", "async function processPayment(userId, orderId, amount) {\n  const user = await db.getUser(userId);\n  if (user.balance >= amount) {\n    await db.updateUser(userId, { balance: user.balance - amount });\n    await db.createOrder({ orderId, userId, amount, status: 'paid' });\n    return { success: true };\n  }\n  return { success: false };\n}")),
      question: "What security vulnerability allows the double-charge scenario?",
      options: [
        "The function does not validate that the amount is positive",
        "Race condition: simultaneous requests can pass the balance check before any update is committed",
        "The function does not encrypt the payment data",
        "Integer overflow when calculating the new balance",
      ],
      correct: 1,
      explanation: "✓ This is a TOCTOU race: two requests both see the old balance before either write lands. Wrap check and update in a transaction with row locking and make the operation idempotent.",
      learning_points: &[
        "Race conditions occur when check and action are separate",
        "Use database transactions with row locking for financial operations",
        "TOCTOU (Time Of Check, Time Of Use) is a common vulnerability",
        "Always test concurrent requests in payment systems",
      ],
    }),
    scenario(ScenarioSeed {
      id: "ir-scenario-1", domain: IncidentResponse, difficulty: Intermediate,
      title: "Ransomware Attack Response",
      context: "Monday 8:00 AM: 45 of 200 workstations and the network file shares are encrypted with a ransom note demanding 5 Bitcoin within 48 hours. The attack began Saturday night; backups exist but are untested and none are offline.",
      diagram: Some("Sat 23:00 infection -> Sun 01:00 lateral movement -> Sun 03:00 encryption -> Mon 08:00 discovery -> Tue 08:00 deadline"),
      code: None,
      question: "What should be your FIRST priority in the incident response process?",
      options: [
        "Immediately pay the ransom to minimize business disruption",
        "Contain the incident by isolating affected systems and disconnecting infected network segments",
        "Restore from backups immediately without testing them first",
        "Call a press conference to inform customers about the breach",
      ],
      correct: 1,
      explanation: "✓ Containment stops the spread and limits damage while preserving evidence. ✗ Paying guarantees nothing, untested restores may be corrupt or overwrite evidence, and public notification comes after scoping.",
      learning_points: &[
        "Containment prevents spread and limits damage",
        "Never pay ransom as first option",
        "Test backups regularly (3-2-1 backup rule)",
        "Offline backups are essential for ransomware defense",
      ],
    }),
    scenario(ScenarioSeed {
      id: "ir-scenario-2", domain: IncidentResponse, difficulty: Advanced,
      title: "APT (Advanced Persistent Threat) Discovery",
      context: "For eight months an executive assistant's workstation has sent 2-5 MB of encrypted traffic nightly to an AWS host your company does not own. Antivirus is clean; the browser runs a highly rated \"ProductivityBooster Pro\" extension and DNS lookups to unusual domains precede each connection.",
      diagram: Some("Browser extension --C2--> extension API calls --data--> unknown AWS server; extension reads corporate email and calendar"),
      code: None,
      question: "What type of attack is this MOST likely, and what should you do?",
      options: [
        "A false positive: the extension is highly rated, so ignore it and keep monitoring",
        "A supply chain attack via a malicious extension exfiltrating data: isolate the system, analyze the extension, hunt for similar infections and notify leadership",
        "Aggressive telemetry from a legitimate extension: ask the user to uninstall it",
        "Immediately wipe and reinstall the computer without further investigation",
      ],
      correct: 1,
      explanation: "✓ Long dwell time, low-and-slow exfiltration and a trusted-looking tool are classic APT traits that need a full incident response. ✗ Ratings prove nothing, uninstalling misses the wider campaign and wiping destroys evidence.",
      learning_points: &[
        "APTs use legitimate tools and infrastructure",
        "Supply chain attacks are increasingly common",
        "Browser extensions can be powerful attack vectors",
        "Low and slow exfiltration evades detection",
        "Always preserve evidence before remediation",
      ],
    }),
  ]
}
