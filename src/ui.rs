/// Renders the landing page with the live tribe count filled in.
pub fn render_index(count: u64) -> String {
    INDEX_HTML.replace("{{COUNT}}", &count.to_string())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Join the Tribe</title>
</head>
<body>
  <main>
    <section id="follow">
      <h1>Join the Tribe</h1>
      <p><span id="followerCount">{{COUNT}}</span> members and counting.</p>
      <form id="followForm">
        <input id="followEmail" type="email" name="email" placeholder="you@example.com" required />
        <button id="verifyBtn" type="button">Verify Email</button>
        <button id="followBtn" type="submit" disabled>Follow Me</button>
      </form>
      <p id="followStatus" role="status"></p>
    </section>

    <section id="contact">
      <h2>Get in touch</h2>
      <form id="contactForm">
        <input name="name" placeholder="Name" required />
        <input name="email" type="email" placeholder="Email" required />
        <textarea name="message" placeholder="Message" required></textarea>
        <button type="submit">Send</button>
      </form>
      <p id="contactStatus" role="status"></p>
    </section>
  </main>

  <script>
    const emailInput = document.getElementById('followEmail');
    const verifyBtn = document.getElementById('verifyBtn');
    const followBtn = document.getElementById('followBtn');
    const followStatus = document.getElementById('followStatus');
    const countEl = document.getElementById('followerCount');
    const emailShape = /^[^\s@]+@[^\s@]+\.[^\s@]+$/;

    let verifiedEmail = null;

    async function postJson(url, body) {
      const res = await fetch(url, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(body),
      });
      const data = await res.json().catch(() => ({}));
      if (!res.ok) throw new Error(data.error || 'Something went wrong. Please try again.');
      return data;
    }

    function resetFollow() {
      verifiedEmail = null;
      verifyBtn.disabled = false;
      followBtn.disabled = true;
    }

    emailInput.addEventListener('input', resetFollow);

    verifyBtn.addEventListener('click', async () => {
      const email = emailInput.value.trim();
      if (!email) { followStatus.textContent = 'Please enter your email address'; return; }
      if (!emailShape.test(email)) { followStatus.textContent = 'Please enter a valid email address'; return; }
      verifyBtn.disabled = true;
      try {
        const { isFollower } = await postJson('/api/check-follower', { email });
        if (isFollower) { followStatus.textContent = 'Already a tribe member!'; return; }
      } catch (err) {
        followStatus.textContent = err.message;
        verifyBtn.disabled = false;
        return;
      }
      followStatus.textContent = 'Verifying...';
      setTimeout(() => {
        if (emailInput.value.trim() !== email) return;
        verifiedEmail = email;
        followStatus.textContent = 'Verified';
        followBtn.disabled = false;
      }, 2000);
    });

    document.getElementById('followForm').addEventListener('submit', async (e) => {
      e.preventDefault();
      if (!verifiedEmail) { followStatus.textContent = 'Please verify your email first'; return; }
      followBtn.disabled = true;
      try {
        const res = await postJson('/api/add-follower', { email: verifiedEmail });
        countEl.textContent = res.count;
        if (!res.success) { followStatus.textContent = res.message; verifiedEmail = null; return; }
        followStatus.textContent = 'Welcome to the tribe!';
        setTimeout(() => { emailInput.value = ''; followStatus.textContent = ''; resetFollow(); }, 5000);
      } catch (err) {
        followStatus.textContent = err.message;
        followBtn.disabled = false;
      }
    });

    document.getElementById('contactForm').addEventListener('submit', async (e) => {
      e.preventDefault();
      const status = document.getElementById('contactStatus');
      const form = new FormData(e.target);
      try {
        const res = await postJson('/api/contact', Object.fromEntries(form));
        status.textContent = res.message;
        e.target.reset();
      } catch (err) {
        status.textContent = err.message;
      }
    });
  </script>
</body>
</html>
"#;
